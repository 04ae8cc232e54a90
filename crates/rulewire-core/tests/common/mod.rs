pub mod ws_server;
