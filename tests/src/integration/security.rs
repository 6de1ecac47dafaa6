//! # Wire Security Scenarios
//!
//! With a key, encrypted fields leave the process as ciphertext only.
//! Without one, encrypted content is refused in both directions.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bus_runtime::compose;
    use qb_01_configuration::{BusConfiguration, SecuritySettings};
    use shared_bus::MessageSerializer;
    use shared_crypto::{SecretKey, SecurityMode};
    use shared_types::{BusMessage, FieldValue, MessageOwner};

    use crate::integration::fixtures::{builder, builder_on, endpoint};

    const CARD: &str = "4111-1111-1111-1111";

    fn payment() -> BusMessage {
        BusMessage::new("Payments.Commands.Charge")
            .with_field("amount", 120)
            .with_encrypted_field("card", CARD)
    }

    fn payments_bus(name: &str) -> BusConfiguration {
        BusConfiguration::new(endpoint(name))
            .with_message_owner(MessageOwner::new("Payments", endpoint("payments")))
    }

    #[tokio::test]
    async fn test_disabled_security_refuses_encrypted_fields() {
        let (transport, builder) = builder(payments_bus("payments"));
        let topology = compose(&builder).unwrap();
        topology.deploy().await.unwrap();
        assert_eq!(topology.security(), SecurityMode::Disabled);

        let err = topology.bus().send(&payment()).await.unwrap_err();

        assert!(err.is_security_rejection(), "{err}");
        assert_eq!(transport.depth(&endpoint("payments")), 0);
    }

    #[tokio::test]
    async fn test_enabled_security_sends_ciphertext_only() {
        let config =
            payments_bus("payments").with_security(SecuritySettings::Enabled(SecretKey::generate()));
        let (transport, builder) = builder(config);
        let topology = compose(&builder).unwrap();
        topology.deploy().await.unwrap();
        assert_eq!(topology.security(), SecurityMode::Enabled);

        topology.bus().send(&payment()).await.unwrap();

        let sent = transport.peek_all(&endpoint("payments"));
        assert_eq!(sent.len(), 1);
        let raw = String::from_utf8_lossy(&sent[0].body);
        assert!(!raw.contains(CARD));
        assert!(raw.contains("Payments.Commands.Charge"));

        let decoded = builder.serializer().unwrap().decode(&sent[0].body).unwrap();
        match decoded.field("card") {
            Some(FieldValue::Encrypted(card)) => assert_eq!(card.value(), CARD),
            other => panic!("card field not restored: {other:?}"),
        }
        assert_eq!(
            decoded.plain("amount").and_then(|v| v.as_i64()),
            Some(120)
        );
    }

    #[tokio::test]
    async fn test_encrypted_message_at_unsecured_bus_goes_to_error_queue() {
        let (transport, receiver_builder) = builder(payments_bus("payments"));
        let receiver = compose(&receiver_builder).unwrap();
        receiver.deploy().await.unwrap();

        let sender_builder = builder_on(
            payments_bus("checkout").with_security(SecuritySettings::Enabled(SecretKey::generate())),
            &transport,
        );
        let sender = compose(&sender_builder).unwrap();
        sender.deploy().await.unwrap();
        sender.bus().send(&payment()).await.unwrap();

        receiver.start().await;
        let error_queue = receiver.bus().error_queue().clone();
        tokio::time::timeout(Duration::from_secs(5), async {
            while transport.depth(&error_queue) == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        receiver.shutdown().await;
        assert_eq!(transport.depth(&error_queue), 1);
    }
}
