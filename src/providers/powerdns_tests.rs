// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `powerdns.rs`

#[cfg(test)]
mod tests {
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::config::ProviderCredentials;
    use crate::diff::Change;
    use crate::errors::{ConfigError, ProviderError};
    use crate::models::{AutoDnssec, DomainConfig, Rdata, Record};
    use crate::providers::powerdns::*;
    use crate::providers::retry::{ExponentialBackoff, RetryPolicy};
    use crate::providers::DnsProvider;

    const ZONE: &str = "example.com";
    const ZONE_PATH: &str = "/api/v1/servers/localhost/zones/example.com.";

    fn fast_retry() -> RetryPolicy {
        let quick = ExponentialBackoff::new(
            Duration::from_millis(1),
            Duration::from_millis(2),
            Some(Duration::from_secs(2)),
            2.0,
            0.0,
        );
        RetryPolicy {
            rate_limit: quick.clone(),
            transient: quick,
            max_transient_retries: 1,
        }
    }

    async fn setup() -> (MockServer, PowerDnsProvider) {
        let server = MockServer::start().await;
        let creds = ProviderCredentials {
            provider_type: Some(PROVIDER_TYPE.into()),
            values: [
                ("api_url".to_string(), server.uri()),
                ("api_key".to_string(), "secret".to_string()),
                ("server_name".to_string(), "localhost".to_string()),
                ("default_ns".to_string(), "ns1.example.net".to_string()),
            ]
            .into_iter()
            .collect(),
        };
        let provider = PowerDnsProvider::from_credentials("pdns", &creds)
            .unwrap()
            .with_retry_policy(fast_retry());
        (server, provider)
    }

    fn zone_body(dnssec: bool) -> serde_json::Value {
        json!({
            "name": "example.com.",
            "dnssec": dnssec,
            "rrsets": [
                {"name": "example.com.", "type": "SOA", "ttl": 3600,
                 "records": [{"content": "ns1.example.net. hostmaster.example.com. 1 10800 3600 604800 3600", "disabled": false}]},
                {"name": "example.com.", "type": "NS", "ttl": 3600,
                 "records": [{"content": "ns1.example.net.", "disabled": false}]},
                {"name": "www.example.com.", "type": "A", "ttl": 300,
                 "records": [
                    {"content": "192.0.2.1", "disabled": false},
                    {"content": "192.0.2.9", "disabled": true}
                 ]}
            ]
        })
    }

    fn a(label: &str, ip: &str) -> Record {
        Record::new(label, ZONE, 300, Rdata::A(ip.parse().unwrap()))
    }

    #[test]
    fn test_to_rrset_replace_and_delete() {
        let create = Change::create(a("www", "192.0.2.1"));
        let rrset = to_rrset(&create);
        assert_eq!(rrset.name, "www.example.com.");
        assert_eq!(rrset.changetype.as_deref(), Some("REPLACE"));
        assert_eq!(rrset.records[0].content, "192.0.2.1");
        assert_eq!(rrset.ttl, 300);

        let delete = to_rrset(&Change::delete(a("www", "192.0.2.1")));
        assert_eq!(delete.changetype.as_deref(), Some("DELETE"));
        assert!(delete.records.is_empty());
    }

    #[test]
    fn test_api_url_must_be_http() {
        let creds = ProviderCredentials {
            provider_type: Some(PROVIDER_TYPE.into()),
            values: [
                ("api_url".to_string(), "ftp://pdns:8081".to_string()),
                ("api_key".to_string(), "secret".to_string()),
                ("server_name".to_string(), "localhost".to_string()),
            ]
            .into_iter()
            .collect(),
        };
        let err = PowerDnsProvider::from_credentials("pdns", &creds).err().unwrap();
        assert!(matches!(err, ConfigError::InvalidCredential { key, .. } if key == "api_url"));
    }

    #[tokio::test]
    async fn test_list_zones() {
        let (server, provider) = setup().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/servers/localhost/zones"))
            .and(header("X-API-Key", "secret"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"name": "example.com."}, {"name": "example.org."}])),
            )
            .mount(&server)
            .await;

        assert_eq!(
            provider.list_zones().await.unwrap(),
            vec!["example.com", "example.org"]
        );
    }

    #[tokio::test]
    async fn test_get_zone_records_skips_soa_and_disabled() {
        let (server, provider) = setup().await;
        Mock::given(method("GET"))
            .and(path(ZONE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(zone_body(false)))
            .mount(&server)
            .await;

        let records = provider.get_zone_records(ZONE, &BTreeMap::new()).await.unwrap();
        let shown: Vec<String> = records.iter().map(ToString::to_string).collect();
        assert_eq!(shown, vec!["@ NS ns1.example.net.", "www A 192.0.2.1"]);
        assert!(records.iter().all(|r| r.original.is_some()));
    }

    #[tokio::test]
    async fn test_unauthorized_is_fatal() {
        let (server, provider) = setup().await;
        Mock::given(method("GET"))
            .and(path(ZONE_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&server)
            .await;

        let err = provider
            .get_zone_records(ZONE, &BTreeMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::AuthenticationFailed { .. }));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_ensure_zone_creates_missing_zone() {
        let (server, provider) = setup().await;
        Mock::given(method("GET"))
            .and(path(ZONE_PATH))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/servers/localhost/zones"))
            .and(body_partial_json(json!({
                "name": "example.com.",
                "kind": "Native",
                "nameservers": ["ns1.example.net."]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"name": "example.com."})))
            .expect(1)
            .mount(&server)
            .await;

        provider.ensure_zone_exists(ZONE).await.unwrap();
    }

    #[tokio::test]
    async fn test_ensure_zone_failure_is_fatal() {
        let (server, provider) = setup().await;
        Mock::given(method("GET"))
            .and(path(ZONE_PATH))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad"))
            .mount(&server)
            .await;

        let err = provider.ensure_zone_exists(ZONE).await.unwrap_err();
        assert!(matches!(err, ProviderError::EnsureZoneFailed { .. }));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_corrections_patch_rrsets() {
        let (server, provider) = setup().await;
        Mock::given(method("GET"))
            .and(path(ZONE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(zone_body(false)))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path(ZONE_PATH))
            .and(body_partial_json(json!({
                "rrsets": [{
                    "name": "www.example.com.",
                    "type": "A",
                    "changetype": "REPLACE",
                    "records": [{"content": "192.0.2.2", "disabled": false}]
                }]
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let dc = DomainConfig {
            name: ZONE.into(),
            records: vec![a("www", "192.0.2.2")],
            ..Default::default()
        };
        let existing = provider.get_zone_records(ZONE, &BTreeMap::new()).await.unwrap();
        let corrections = provider.get_zone_records_corrections(&dc, existing).unwrap();

        // Apex NS is left to the server when the configuration has none.
        let actionable: Vec<_> = corrections.into_iter().filter(|c| !c.is_report()).collect();
        assert_eq!(actionable.len(), 1);
        for c in actionable {
            c.execute().await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_rate_limited_patch_is_retried() {
        let (server, provider) = setup().await;
        Mock::given(method("PATCH"))
            .and(path(ZONE_PATH))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
            .up_to_n_times(2)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path(ZONE_PATH))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let dc = DomainConfig {
            name: ZONE.into(),
            records: vec![a("api", "192.0.2.7")],
            ..Default::default()
        };
        let corrections = provider.get_zone_records_corrections(&dc, vec![]).unwrap();
        for c in corrections {
            c.execute().await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_auto_dnssec_on_adds_key() {
        let (server, provider) = setup().await;
        Mock::given(method("GET"))
            .and(path(ZONE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(zone_body(false)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("{ZONE_PATH}/cryptokeys")))
            .and(body_partial_json(json!({"keytype": "csk", "active": true})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1})))
            .expect(1)
            .mount(&server)
            .await;

        let dc = DomainConfig {
            name: ZONE.into(),
            records: vec![a("www", "192.0.2.1")],
            auto_dnssec: AutoDnssec::On,
            ..Default::default()
        };
        let existing = provider.get_zone_records(ZONE, &BTreeMap::new()).await.unwrap();
        let corrections = provider.get_zone_records_corrections(&dc, existing).unwrap();
        let dnssec: Vec<_> = corrections
            .into_iter()
            .filter(|c| c.msg == "Enable AutoDNSSEC")
            .collect();
        assert_eq!(dnssec.len(), 1);
        for c in dnssec {
            c.execute().await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_auto_dnssec_off_removes_keys() {
        let (server, provider) = setup().await;
        Mock::given(method("GET"))
            .and(path(ZONE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(zone_body(true)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{ZONE_PATH}/cryptokeys")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 7}])))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path(format!("{ZONE_PATH}/cryptokeys/7")))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let dc = DomainConfig {
            name: ZONE.into(),
            records: vec![a("www", "192.0.2.1")],
            auto_dnssec: AutoDnssec::Off,
            ..Default::default()
        };
        let existing = provider.get_zone_records(ZONE, &BTreeMap::new()).await.unwrap();
        for c in provider.get_zone_records_corrections(&dc, existing).unwrap() {
            c.execute().await.unwrap();
        }
    }
}
