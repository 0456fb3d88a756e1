// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `ordering.rs`

#[cfg(test)]
mod tests {
    use crate::diff::{annotate_dependencies, Change, ChangeType};
    use crate::models::{Rdata, Record};
    use crate::ordering::*;

    const ZONE: &str = "example.com";

    fn a(label: &str, ip: &str) -> Record {
        Record::new(label, ZONE, 300, Rdata::A(ip.parse().unwrap()))
    }

    fn cname(label: &str, target: &str) -> Record {
        Record::new(label, ZONE, 300, Rdata::Cname(target.to_string()))
    }

    fn ns(target: &str) -> Record {
        Record::new("@", ZONE, 300, Rdata::Ns(target.to_string()))
    }

    fn labels(changes: &[Change]) -> Vec<String> {
        changes.iter().map(|c| c.label.clone()).collect()
    }

    #[test]
    fn test_no_hints_keeps_order() {
        let changes = vec![
            Change::create(a("b", "1.1.1.1")),
            Change::create(a("a", "1.1.1.1")),
        ];
        let (ordered, err) = order_changes(changes);
        assert!(err.is_none());
        assert_eq!(labels(&ordered), vec!["b", "a"]);
    }

    #[test]
    fn test_dependents_follow_providers() {
        let mut changes = vec![
            Change::create(cname("www", "web.example.com.")),
            Change::create(cname("web", "origin.example.com.")),
            Change::create(a("origin", "1.1.1.1")),
            Change::create(a("other", "2.2.2.2")),
        ];
        annotate_dependencies(&mut changes, ZONE);
        let (ordered, err) = order_changes(changes);
        assert!(err.is_none());
        assert_eq!(labels(&ordered), vec!["origin", "other", "web", "www"]);
    }

    #[test]
    fn test_cycle_degrades_gracefully() {
        let mut changes = vec![
            Change::create(cname("x", "y.example.com.")),
            Change::create(cname("y", "x.example.com.")),
            Change::create(a("z", "1.1.1.1")),
        ];
        annotate_dependencies(&mut changes, ZONE);
        let (ordered, err) = order_changes(changes);
        let err = err.unwrap();
        assert_eq!(err.missing, vec!["y.example.com"]);
        assert_eq!(labels(&ordered), vec!["z", "x", "y"]);
    }

    #[test]
    fn test_wrap_last_ns() {
        let changes = vec![
            Change::delete(ns("ns1.old.")),
            Change::create(ns("ns1.new.")),
        ];
        let wrapped = wrap_last_ns(changes, ZONE);
        assert_eq!(wrapped.len(), 4);
        assert_eq!(wrapped[0].kind, ChangeType::Create);
        assert_eq!(wrapped[0].new[0].rdata.target(), Some("255.255.255.255."));
        assert_eq!(wrapped[3].kind, ChangeType::Delete);
        assert_eq!(wrapped[3].old[0].rdata.target(), Some("255.255.255.255."));
    }

    #[test]
    fn test_wrap_last_ns_ignores_other_changes() {
        let sub_ns = Record::new("sub", ZONE, 300, Rdata::Ns("ns1.other.".to_string()));
        let changes = vec![Change::create(sub_ns), Change::create(a("www", "1.1.1.1"))];
        assert_eq!(wrap_last_ns(changes, ZONE).len(), 2);
    }

    #[test]
    fn test_submission_batches_by_name() {
        let changes = vec![
            Change::delete(a("www", "1.1.1.1")),
            Change::create(a("www", "2.2.2.2")),
            Change::create(a("api", "3.3.3.3")),
        ];
        let batches = submission_batches(changes, false);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 2);
    }

    #[test]
    fn test_buggy_cname_splits_batch() {
        let changes = vec![
            Change::delete(a("www", "1.1.1.1")),
            Change::create(cname("www", "web.example.com.")),
        ];
        assert_eq!(submission_batches(changes.clone(), false).len(), 1);
        let split = submission_batches(changes, true);
        assert_eq!(split.len(), 2);
        assert_eq!(split[0][0].kind, ChangeType::Delete);
        assert_eq!(split[1][0].key.rtype, "CNAME");
    }
}
