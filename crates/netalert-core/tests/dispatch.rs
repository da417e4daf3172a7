//! End-to-end dispatch behaviour through the public API

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use netalert::alerting::{
    AlertConfigStore, AlertDispatcher, AlertRecordStore, ChannelSender, ChannelSenders, SendError,
};
use netalert::config::ChannelsConfig;
use netalert::db::{MemoryStore, Stores};
use netalert::models::{
    AlertConfig, AlertConfigInput, AlertConfigSummary, AlertLevel, ChannelKind, Comparison,
    DispatchRequest, Recipient, Role, SendStatus,
};
use netalert::{Error, Result};

/// Succeeds unless the destination is listed as failing
struct Outcomes {
    failing: Vec<String>,
}

#[async_trait]
impl ChannelSender for Outcomes {
    fn channel_type(&self) -> &'static str {
        "test"
    }

    async fn send(
        &self,
        destination: &str,
        _subject: Option<&str>,
        _body: &str,
    ) -> std::result::Result<(), SendError> {
        if self.failing.iter().any(|d| d == destination) {
            Err(SendError::Smtp("authentication failed".to_string()))
        } else {
            Ok(())
        }
    }
}

fn senders(failing: &[String]) -> ChannelSenders {
    let sender = Arc::new(Outcomes {
        failing: failing.to_vec(),
    });
    ChannelSenders {
        email: sender.clone(),
        chat: sender.clone(),
        sms: sender,
    }
}

fn request(config_id: i64, device_id: &str, message: Option<&str>) -> DispatchRequest {
    DispatchRequest {
        device_id: device_id.to_string(),
        alert_config_id: config_id,
        metric: "if_in_errors".to_string(),
        metric_value: 12.0,
        message: message.map(String::from),
    }
}

fn input(channels: Vec<ChannelKind>) -> AlertConfigInput {
    AlertConfigInput {
        name: "errors".to_string(),
        device_id: "D1".to_string(),
        metric: "if_in_errors".to_string(),
        threshold: 10.0,
        comparison: Comparison::Gte,
        channels,
        enabled: true,
    }
}

/// Config store whose single config can be edited between dispatches
struct EditableConfig {
    config: Mutex<AlertConfig>,
}

#[async_trait]
impl AlertConfigStore for EditableConfig {
    async fn create_config(&self, _input: AlertConfigInput) -> Result<i64> {
        Err(Error::internal("read-only"))
    }

    async fn get_config(&self, id: i64) -> Result<Option<AlertConfig>> {
        let config = self.config.lock().clone();
        Ok((config.id == id).then_some(config))
    }

    async fn list_configs(&self) -> Result<Vec<AlertConfigSummary>> {
        Ok(vec![AlertConfigSummary::from(&*self.config.lock())])
    }
}

#[tokio::test]
async fn test_empty_channel_set_records_failure() {
    let store = Arc::new(MemoryStore::with_recipients(vec![Recipient {
        email: Some("a@x.com".to_string()),
        phone: Some("111".to_string()),
        role: Role::Admin,
    }]));
    let id = store.create_config(input(vec![])).await.unwrap();
    let dispatcher = AlertDispatcher::new(
        &Stores::shared(store.clone()),
        senders(&[]),
        &ChannelsConfig::default(),
    );

    let outcome = dispatcher.dispatch(request(id, "D1", None)).await.unwrap();

    assert!(outcome.results.is_empty());
    assert_eq!(outcome.send_status, SendStatus::Failed);
    let records = store.list_records(Some("D1"), 50).await.unwrap();
    assert_eq!(records[0].send_status, SendStatus::Failed);
    assert!(records[0].channels.is_empty());
}

#[tokio::test]
async fn test_record_keeps_channel_snapshot_after_config_edit() {
    let records = Arc::new(MemoryStore::with_recipients(vec![Recipient {
        email: Some("a@x.com".to_string()),
        phone: None,
        role: Role::Operator,
    }]));
    let configs = Arc::new(EditableConfig {
        config: Mutex::new(AlertConfig {
            id: 5,
            name: "errors".to_string(),
            device_id: "D1".to_string(),
            metric: "if_in_errors".to_string(),
            threshold: 10.0,
            comparison: Comparison::Gt,
            channels: vec![ChannelKind::Email, ChannelKind::Unknown("fax".to_string())],
            enabled: true,
        }),
    });
    let stores = Stores {
        configs: configs.clone(),
        records: records.clone(),
        directory: records.clone(),
    };
    let dispatcher = AlertDispatcher::new(&stores, senders(&[]), &ChannelsConfig::default());

    dispatcher.dispatch(request(5, "D1", None)).await.unwrap();
    configs.config.lock().channels = vec![ChannelKind::Sms];
    dispatcher.dispatch(request(5, "D1", None)).await.unwrap();

    let stored = records.list_records(Some("D1"), 50).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].channels, vec![ChannelKind::Sms]);
    assert_eq!(
        stored[1].channels,
        vec![ChannelKind::Email, ChannelKind::Unknown("fax".to_string())]
    );
}

#[tokio::test]
async fn test_records_listed_per_device_newest_first() {
    let store = Arc::new(MemoryStore::new());
    let id = store.create_config(input(vec![ChannelKind::Wechat])).await.unwrap();
    let dispatcher = AlertDispatcher::new(
        &Stores::shared(store.clone()),
        senders(&[]),
        &ChannelsConfig::default(),
    );

    for i in 0..55 {
        let device = if i % 2 == 0 { "D1" } else { "D2" };
        dispatcher
            .dispatch(request(id, device, Some(&format!("event {i}"))))
            .await
            .unwrap();
    }

    let d1 = store.list_records(Some("D1"), 50).await.unwrap();
    assert_eq!(d1.len(), 28);
    assert!(d1.iter().all(|r| r.device_id == "D1"));
    assert_eq!(d1[0].message, "event 54");

    let all = store.list_records(None, 50).await.unwrap();
    assert_eq!(all.len(), 50);
    assert_eq!(all[0].message, "event 54");
}

#[tokio::test]
async fn test_webhook_failure_does_not_stop_fan_out() {
    let mut channels = ChannelsConfig::default();
    channels.wechat_webhook = Some("http://127.0.0.1:9/hook".to_string());
    let store = Arc::new(MemoryStore::with_recipients(vec![Recipient {
        email: None,
        phone: Some("111".to_string()),
        role: Role::Operator,
    }]));
    let id = store
        .create_config(input(vec![ChannelKind::Wechat, ChannelKind::Sms]))
        .await
        .unwrap();
    let dispatcher = AlertDispatcher::new(
        &Stores::shared(store.clone()),
        senders(&["http://127.0.0.1:9/hook".to_string()]),
        &channels,
    );

    let outcome = dispatcher.dispatch(request(id, "D1", None)).await.unwrap();

    let expected = BTreeMap::from([("sms_111".to_string(), true), ("wechat".to_string(), false)]);
    assert_eq!(outcome.results, expected);
    assert_eq!(outcome.send_status, SendStatus::Success);
}

proptest! {
    #[test]
    fn prop_send_status_is_success_iff_any_send_succeeds(
        emails in proptest::collection::vec(any::<bool>(), 0..5),
        phones in proptest::collection::vec(any::<bool>(), 0..5),
        use_email in any::<bool>(),
        use_sms in any::<bool>(),
    ) {
        // each flag is one recipient; `true` means its send succeeds
        let mut recipients = Vec::new();
        let mut failing = Vec::new();
        for (i, ok) in emails.iter().enumerate() {
            let address = format!("user{i}@x.com");
            if !ok {
                failing.push(address.clone());
            }
            recipients.push(Recipient { email: Some(address), phone: None, role: Role::Admin });
        }
        for (i, ok) in phones.iter().enumerate() {
            let phone = format!("1380000{i:04}");
            if !ok {
                failing.push(phone.clone());
            }
            recipients.push(Recipient { email: None, phone: Some(phone), role: Role::Operator });
        }

        let mut channels = Vec::new();
        if use_email {
            channels.push(ChannelKind::Email);
        }
        if use_sms {
            channels.push(ChannelKind::Sms);
        }

        let expected_success = (use_email && emails.iter().any(|ok| *ok))
            || (use_sms && phones.iter().any(|ok| *ok));

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (outcome, stored) = runtime.block_on(async {
            let store = Arc::new(MemoryStore::with_recipients(recipients));
            let id = store.create_config(input(channels)).await.unwrap();
            let dispatcher = AlertDispatcher::new(
                &Stores::shared(store.clone()),
                senders(&failing),
                &ChannelsConfig::default(),
            );
            let outcome = dispatcher.dispatch(request(id, "D1", None)).await.unwrap();
            let stored = store.list_records(None, 50).await.unwrap();
            (outcome, stored)
        });

        prop_assert_eq!(outcome.is_success(), expected_success);
        prop_assert_eq!(
            outcome.send_status == SendStatus::Success,
            outcome.results.values().any(|ok| *ok)
        );
        prop_assert_eq!(stored.len(), 1);
        prop_assert_eq!(stored[0].send_status, outcome.send_status);
    }

    #[test]
    fn prop_alert_level_only_depends_on_critical_token(
        prefix in "[a-z ]{0,12}",
        suffix in "[a-z ]{0,12}",
        token in prop::sample::select(vec!["critical", "CRITICAL", "Critical", "cRiTiCaL"]),
    ) {
        let with_token = format!("{prefix}{token}{suffix}");
        prop_assert_eq!(AlertLevel::from_message(&with_token), AlertLevel::Critical);

        let without = format!("{prefix}{suffix}");
        let expected = if without.contains("critical") {
            AlertLevel::Critical
        } else {
            AlertLevel::Warning
        };
        prop_assert_eq!(AlertLevel::from_message(&without), expected);
    }
}
