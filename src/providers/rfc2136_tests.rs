// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `rfc2136.rs`

#[cfg(test)]
mod tests {
    use hickory_client::op::{OpCode, UpdateMessage};
    use hickory_client::rr::rdata::tsig::TsigAlgorithm;
    use hickory_client::rr::{rdata, DNSClass, Name, RData, Record as DnsRecord};
    use hickory_proto::serialize::binary::BinEncodable;
    use std::str::FromStr;
    use std::sync::atomic::Ordering;
    use std::sync::mpsc;
    use std::time::Duration;

    use crate::config::ProviderCredentials;
    use crate::diff::{Change, ChangeType};
    use crate::errors::ConfigError;
    use crate::models::{DomainConfig, Rdata, Record};
    use crate::providers::rfc2136::*;

    const ZONE: &str = "example.com";

    fn creds(pairs: &[(&str, &str)]) -> ProviderCredentials {
        ProviderCredentials {
            provider_type: Some(PROVIDER_TYPE.into()),
            values: pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        }
    }

    fn ns(target: &str) -> Record {
        Record::new("@", ZONE, 300, Rdata::Ns(target.into()))
    }

    #[test]
    fn test_parse_algorithm() {
        assert_eq!(parse_algorithm("hmac-sha256").unwrap(), TsigAlgorithm::HmacSha256);
        assert_eq!(parse_algorithm("SHA512").unwrap(), TsigAlgorithm::HmacSha512);
        assert_eq!(parse_algorithm("hmac-md5").unwrap(), TsigAlgorithm::HmacMd5);
        assert!(parse_algorithm("rot13").is_err());
    }

    #[test]
    fn test_server_required() {
        let err = Rfc2136Provider::from_credentials("dyn", &creds(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredentials { keys, .. } if keys == vec!["server"]));
    }

    #[test]
    fn test_incomplete_tsig_key() {
        let err = Rfc2136Provider::from_credentials(
            "dyn",
            &creds(&[("server", "127.0.0.1"), ("key_name", "update-key")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredentials { keys, .. } if keys == vec!["key_secret"]));
    }

    #[test]
    fn test_bad_secret() {
        let err = Rfc2136Provider::from_credentials(
            "dyn",
            &creds(&[
                ("server", "127.0.0.1"),
                ("key_name", "update-key"),
                ("key_secret", "not base64!!"),
            ]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCredential { key, .. } if key == "key_secret"));
    }

    #[test]
    fn test_valid_credentials() {
        assert!(Rfc2136Provider::from_credentials(
            "dyn",
            &creds(&[
                ("server", "127.0.0.1:5353"),
                ("key_name", "update-key"),
                ("key_algorithm", "hmac-sha256"),
                ("key_secret", "c2VjcmV0"),
                ("buggy_cname", "true"),
            ]),
        )
        .is_ok());
    }

    #[test]
    fn test_to_wire() {
        assert!(matches!(
            to_wire(&Rdata::A("192.0.2.1".parse().unwrap())).unwrap(),
            RData::A(_)
        ));
        assert!(matches!(
            to_wire(&Rdata::Mx {
                preference: 10,
                exchange: "mx.example.com.".into()
            })
            .unwrap(),
            RData::MX(_)
        ));
        assert!(to_wire(&Rdata::Caa {
            flags: 0,
            tag: "issue".into(),
            value: "ca.example".into()
        })
        .is_err());
    }

    #[test]
    fn test_from_wire_txt_keeps_segments() {
        let rr = DnsRecord::from_rdata(
            Name::from_str("txt.example.com.").unwrap(),
            600,
            RData::TXT(rdata::TXT::new(vec!["v=spf1".into(), " -all".into()])),
        );
        let record = from_wire(&rr, ZONE).unwrap();
        assert_eq!(record.label, "txt");
        assert_eq!(record.ttl, 600);
        assert_eq!(record.rdata, Rdata::Txt(vec!["v=spf1".into(), " -all".into()]));
        assert!(record.original.is_some());
    }

    #[test]
    fn test_from_wire_skips_soa() {
        let rr = DnsRecord::from_rdata(
            Name::from_str("example.com.").unwrap(),
            3600,
            RData::SOA(rdata::SOA::new(
                Name::from_str("ns1.example.com.").unwrap(),
                Name::from_str("admin.example.com.").unwrap(),
                1,
                3600,
                600,
                604_800,
                86400,
            )),
        );
        assert!(from_wire(&rr, ZONE).is_none());
    }

    #[test]
    fn test_build_update_sections() {
        let batch = vec![
            Change::delete(Record::new("www", ZONE, 300, Rdata::A("192.0.2.1".parse().unwrap()))),
            Change::create(Record::new("www", ZONE, 600, Rdata::A("192.0.2.2".parse().unwrap()))),
        ];
        let message = build_update("dyn", ZONE, &batch).unwrap();
        assert_eq!(message.op_code(), OpCode::Update);
        assert_eq!(message.zones().len(), 1);
        let updates = message.updates();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].dns_class(), DNSClass::NONE);
        assert_eq!(updates[0].ttl(), 0);
        assert_eq!(updates[1].dns_class(), DNSClass::IN);
        assert_eq!(updates[1].ttl(), 600);
    }

    #[test]
    fn test_long_txt_is_split_for_the_wire() {
        let dkim = "k".repeat(400);
        let batch = vec![Change::create(Record::new(
            "sel._domainkey",
            ZONE,
            300,
            Rdata::Txt(vec![dkim.clone()]),
        ))];
        let message = build_update("dyn", ZONE, &batch).unwrap();
        assert!(message.to_bytes().is_ok());

        let Some(RData::TXT(txt)) = message.updates()[0].data() else {
            panic!("expected TXT data");
        };
        let lengths: Vec<usize> = txt.txt_data().iter().map(|s| s.len()).collect();
        assert_eq!(lengths, vec![255, 145]);
        assert_eq!(txt.txt_data().concat(), dkim.into_bytes());
    }

    #[tokio::test]
    async fn test_timed_out_exchange_is_flagged_abandoned() {
        let provider = Rfc2136Provider::from_credentials("dyn", &creds(&[("server", "127.0.0.1")]))
            .unwrap();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let (seen_tx, seen_rx) = mpsc::channel();

        let exchange = provider.blocking(move |_, abandoned| {
            release_rx.recv().ok();
            seen_tx.send(abandoned.load(Ordering::SeqCst)).ok();
            Ok(())
        });
        assert!(tokio::time::timeout(Duration::from_millis(50), exchange)
            .await
            .is_err());

        release_tx.send(()).unwrap();
        assert!(seen_rx.recv_timeout(Duration::from_secs(5)).unwrap());
    }

    #[test]
    fn test_plan_batches_guards_last_ns() {
        let dc = DomainConfig {
            name: ZONE.into(),
            records: vec![ns("ns1.new."), ns("ns2.new.")],
            ..Default::default()
        };
        let (batches, _) = plan_batches(&dc, &[ns("ns1.old."), ns("ns2.old.")], false).unwrap();

        // Every change is at the apex, so one UPDATE carries them all.
        assert_eq!(batches.len(), 1);
        let steps: Vec<(ChangeType, String)> = batches[0]
            .iter()
            .map(|c| {
                let record = c.new.first().or(c.old.first()).unwrap();
                (c.kind, record.rdata.to_string())
            })
            .collect();
        assert_eq!(
            steps,
            vec![
                (ChangeType::Create, "255.255.255.255.".to_string()),
                (ChangeType::Delete, "ns1.old.".to_string()),
                (ChangeType::Delete, "ns2.old.".to_string()),
                (ChangeType::Create, "ns1.new.".to_string()),
                (ChangeType::Create, "ns2.new.".to_string()),
                (ChangeType::Delete, "255.255.255.255.".to_string()),
            ]
        );
    }

    #[test]
    fn test_plan_batches_noop() {
        let dc = DomainConfig {
            name: ZONE.into(),
            records: vec![ns("ns1.example.net.")],
            ..Default::default()
        };
        let (batches, messages) = plan_batches(&dc, &dc.records.clone(), false).unwrap();
        assert!(batches.is_empty());
        assert!(messages.is_empty());
    }
}
