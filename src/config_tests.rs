// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `config.rs`

#[cfg(test)]
mod tests {
    use crate::config::*;
    use crate::errors::ConfigError;
    use crate::models::{AutoDnssec, Rdata, Record};
    use std::collections::BTreeMap;
    use std::io::Write;

    const SAMPLE_JSON: &str = r#"{
        "registrars": [{"name": "none", "type": "NONE"}],
        "dns_providers": [{"name": "mem"}],
        "domains": [{
            "name": "example.com",
            "registrar": "none",
            "dns_providers": ["mem"],
            "no_purge": true,
            "auto_dnssec": "on",
            "records": [
                {"type": "A", "name": "www", "target": "192.0.2.1"},
                {"type": "A", "name": "old", "target": "192.0.2.9", "ensure_absent": true},
                {"type": "MX", "name": "@", "target": "10 mail", "ttl": 3600}
            ],
            "unmanaged": [{"label_pattern": "foo*", "rtypes": ["A"]}]
        }]
    }"#;

    #[test]
    fn test_load_json_dnsconfig() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(SAMPLE_JSON.as_bytes()).unwrap();

        let config = load_dnsconfig(file.path()).unwrap();
        assert_eq!(config.domains.len(), 1);
        let domain = &config.domains[0];
        assert!(domain.no_purge);
        assert_eq!(domain.auto_dnssec, AutoDnssec::On);
        assert_eq!(domain.records.len(), 3);
        assert!(domain.records[1].ensure_absent);
        assert_eq!(domain.records[2].ttl, Some(3600));
        assert_eq!(domain.unmanaged[0].label_pattern, "foo*");
        assert_eq!(config.declared_type("none"), Some("NONE"));
        assert_eq!(config.declared_type("mem"), None);
    }

    #[test]
    fn test_load_yaml_dnsconfig() {
        let yaml = r"
dns_providers:
  - name: mem
domains:
  - name: example.org
    dns_providers: [mem]
    records:
      - { type: TXT, name: '@', target: 'hello' }
";
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config = load_dnsconfig(file.path()).unwrap();
        assert_eq!(config.domains[0].name, "example.org");
        assert_eq!(config.domains[0].auto_dnssec, AutoDnssec::Unset);
        assert_eq!(config.domains[0].records[0].rtype, "TXT");
    }

    #[test]
    fn test_invalid_json_mentions_path() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(b"{ not json").unwrap();
        let err = load_dnsconfig(file.path()).unwrap_err();
        assert!(err.to_string().contains("invalid JSON"));
    }

    #[test]
    fn test_retain_domains() {
        let mut config: DnsConfig = serde_json::from_str(SAMPLE_JSON).unwrap();
        config.retain_domains(&["EXAMPLE.com.".to_string()]);
        assert_eq!(config.domains.len(), 1);
        config.retain_domains(&["other.org".to_string()]);
        assert!(config.domains.is_empty());
    }

    #[test]
    fn test_credentials_env_substitution() {
        let mut entry = BTreeMap::new();
        entry.insert("TYPE".to_string(), "POWERDNS".to_string());
        entry.insert("api_key".to_string(), "$PDNS_KEY".to_string());
        entry.insert("api_url".to_string(), "http://localhost:8081".to_string());
        let raw = BTreeMap::from([("pdns".to_string(), entry)]);

        let creds = Credentials::from_map(raw, |var| {
            (var == "PDNS_KEY").then(|| "s3cret".to_string())
        })
        .unwrap();
        let pdns = creds.get("pdns").unwrap();
        assert_eq!(pdns.provider_type.as_deref(), Some("POWERDNS"));
        assert_eq!(pdns.get("api_key"), Some("s3cret"));
        assert!(pdns.get("TYPE").is_none());
    }

    #[test]
    fn test_credentials_missing_env() {
        let entry = BTreeMap::from([("api_key".to_string(), "$NOPE".to_string())]);
        let raw = BTreeMap::from([("pdns".to_string(), entry)]);
        let err = Credentials::from_map(raw, |_| None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvironment { ref var, .. } if var == "NOPE"));
    }

    #[test]
    fn test_missing_credentials_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let creds = load_credentials(&dir.path().join("creds.json")).unwrap();
        assert!(creds.get("anything").is_none());
    }

    #[test]
    fn test_raw_record_from_record() {
        let record = Record::new(
            "mail",
            "example.com",
            600,
            Rdata::Mx {
                preference: 10,
                exchange: "mx.example.com.".to_string(),
            },
        );
        let raw = RawRecord::from_record(&record);
        assert_eq!(raw.rtype, "MX");
        assert_eq!(raw.name, "mail");
        assert_eq!(raw.target, "10 mx.example.com.");
        assert_eq!(raw.ttl, Some(600));
    }
}
