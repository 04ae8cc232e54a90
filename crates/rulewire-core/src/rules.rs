//! Minimal typed model of a rulebook: rule sets parsed from YAML.
//!
//! Matching semantics live in the rule engine, not here; this validates the
//! document shape the controller ships and hands the engine a typed list.

use serde::Deserialize;
use serde_yaml::Value;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Rule {
    #[serde(default)]
    pub name: Option<String>,
    pub condition: Value,
    #[serde(default)]
    pub action: Option<Value>,
    #[serde(default)]
    pub actions: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RuleSet {
    pub name: String,
    #[serde(default)]
    pub hosts: Vec<String>,
    #[serde(default)]
    pub sources: Vec<Value>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// Parse a rulebook document: a YAML list of rule sets.
pub fn parse_rule_sets(data: &[u8]) -> Result<Vec<RuleSet>, serde_yaml::Error> {
    serde_yaml::from_slice(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULEBOOK: &str = r#"
- name: Demo rules
  hosts:
    - all
  sources:
    - ansible.eda.range:
        limit: 5
  rules:
    - name: Say hello
      condition: event.i == 1
      action:
        debug:
          msg: hello
    - condition: event.i > 2
      actions:
        - debug:
        - print_event:
"#;

    #[test]
    fn parses_rule_sets() {
        let sets = parse_rule_sets(RULEBOOK.as_bytes()).unwrap();
        assert_eq!(sets.len(), 1);
        let set = &sets[0];
        assert_eq!(set.name, "Demo rules");
        assert_eq!(set.hosts, vec!["all"]);
        assert_eq!(set.sources.len(), 1);
        assert_eq!(set.rules.len(), 2);
        assert_eq!(set.rules[0].name.as_deref(), Some("Say hello"));
        assert!(set.rules[0].action.is_some());
        assert_eq!(set.rules[1].actions.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn rejects_non_list_documents() {
        assert!(parse_rule_sets(b"name: not a list\n").is_err());
    }

    #[test]
    fn missing_rule_set_name_is_an_error() {
        assert!(parse_rule_sets(b"- hosts: [all]\n  rules: []\n").is_err());
    }
}
