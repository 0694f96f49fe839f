// Copyright 2026 Hybrid Mount Developers
// SPDX-License-Identifier: GPL-3.0-or-later

use std::collections::HashSet;

use crate::core::rules::Rule;

/// Merges the user hide list into the active rule listing.
///
/// The two inputs come from separate engine reads, so any ownership flag
/// already on `rules` may be stale. Every flag is recomputed here, and
/// internal rules are dropped.
pub fn reconcile(user_paths: &HashSet<String>, rules: Vec<Rule>) -> Vec<Rule> {
    rules
        .into_iter()
        .filter(|rule| !rule.kind.is_internal())
        .map(|mut rule| {
            rule.is_user_defined = rule.owned_by(user_paths);
            rule
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::core::rules::{RuleKind, parse_rules};

    fn set(paths: &[&str]) -> HashSet<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn only_listed_hide_rules_are_user_defined() {
        let rules = vec![
            Rule::new(RuleKind::Hide, "/data/adb/magisk"),
            Rule::new(RuleKind::Hide, "/system/app/X"),
        ];
        let out = reconcile(&set(&["/data/adb/magisk"]), rules);
        let flags: Vec<bool> = out.iter().map(|r| r.is_user_defined).collect();
        assert_eq!(flags, [true, false]);
    }

    #[test]
    fn stale_flags_are_overwritten() {
        let stale = vec![
            Rule {
                is_user_defined: true,
                ..Rule::new(RuleKind::Hide, "/removed/meanwhile")
            },
            Rule {
                is_user_defined: true,
                ..Rule::new(RuleKind::Spoof, "uname").with_target("5.10.0")
            },
            Rule::new(RuleKind::Hide, "/added/meanwhile"),
        ];
        let out = reconcile(&set(&["/added/meanwhile", "uname"]), stale);
        let flags: Vec<bool> = out.iter().map(|r| r.is_user_defined).collect();
        assert_eq!(flags, [false, false, true]);
    }

    #[test]
    fn inject_rules_never_survive() {
        let rules = vec![
            Rule::new(RuleKind::Inject, "/system/bin/x"),
            Rule::new(RuleKind::Hide, "/a"),
        ];
        let out = reconcile(&set(&["/system/bin/x"]), rules);
        assert_eq!(out, vec![Rule::new(RuleKind::Hide, "/a")]);
    }

    #[test]
    fn merge_rule_from_structured_listing() {
        let stdout = r#"[{"type":"MERGE","path":"/system/app",
            "source":"/data/adb/modules/foo/system/app"}]"#;
        let user = set(&["/system/app"]);
        let out = reconcile(&user, parse_rules(stdout, &user));
        assert_eq!(
            out,
            vec![Rule {
                kind: RuleKind::Merge,
                path: "/system/app".into(),
                target: None,
                source: Some("/data/adb/modules/foo/system/app".into()),
                is_user_defined: false,
            }]
        );
    }
}
