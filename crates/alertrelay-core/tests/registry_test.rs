//! Registry behaviour under reload and concurrent lookup.
//!
//! Property tests check that every declared receiver round-trips through a
//! file reload and that undeclared names never produce a zero-value success.
//! The concurrency test hammers the registry with lookups while another
//! thread alternates between two configurations whose fields are tagged by
//! generation, so a torn read would show up as mismatched tags.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};

use alertrelay_core::{
    Configuration, Mentions, ReceiverConfig, ReceiverRegistry, RegistryError,
};
use proptest::prelude::*;

fn receiver_strategy() -> impl Strategy<Value = ReceiverConfig> {
    (
        "[a-zA-Z0-9]{1,32}",                                              // access_token
        "https://open\\.feishu\\.cn/open-apis/bot/v2/hook/[a-z0-9]{4,12}", // fsurl
        proptest::option::of((
            prop::collection::vec("1[3-9][0-9]{9}", 0..3),
            prop::collection::vec("[a-z]{3,8}@example\\.com", 0..3),
        )),
    )
        .prop_map(|(access_token, fsurl, mentions)| ReceiverConfig {
            access_token,
            fsurl,
            mentions: mentions.map(|(mobiles, emails)| Mentions { mobiles, emails }),
        })
}

fn configuration_strategy() -> impl Strategy<Value = Configuration> {
    (
        "cli_[a-z0-9]{8}",
        "[a-zA-Z0-9]{16}",
        prop::collection::hash_map("[a-z][a-z0-9_-]{0,15}", receiver_strategy(), 0..6),
    )
        .prop_map(|(app_id, app_secret, receivers)| Configuration {
            app_id,
            app_secret,
            receivers,
        })
}

proptest! {
    #[test]
    fn reload_then_lookup_returns_configured_values(config in configuration_strategy()) {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), serde_yaml::to_string(&config).unwrap()).unwrap();

        let registry = ReceiverRegistry::default();
        registry.reload(file.path()).unwrap();

        for (name, expected) in &config.receivers {
            let found = registry.lookup_receiver(name).unwrap();
            prop_assert_eq!(&found, expected);
        }
        prop_assert_eq!(registry.receiver_count(), config.receivers.len());
        prop_assert_eq!(&registry.snapshot().app_id, &config.app_id);
    }

    #[test]
    fn undeclared_names_are_never_found(
        config in configuration_strategy(),
        name in "[A-Z]{1,12}",
    ) {
        // Generated receiver names are lowercase, so an uppercase name is
        // never declared.
        let registry = ReceiverRegistry::new(config);
        let result = registry.lookup_receiver(&name);
        prop_assert_eq!(result, Err(RegistryError::not_found(name.clone())));
    }
}

fn tagged_configuration(generation: &str) -> Configuration {
    let receivers = (0..8)
        .map(|i| {
            (format!("receiver-{i}"), ReceiverConfig {
                access_token: format!("{generation}-token"),
                fsurl: format!("https://hooks.example.com/{generation}"),
                mentions: Some(Mentions {
                    mobiles: vec![format!("{generation}-mobile")],
                    emails: vec![format!("{generation}@example.com")],
                }),
            })
        })
        .collect::<HashMap<_, _>>();

    Configuration {
        app_id: format!("{generation}-app"),
        app_secret: format!("{generation}-secret"),
        receivers,
    }
}

fn generation_of(receiver: &ReceiverConfig) -> &str {
    receiver.access_token.trim_end_matches("-token")
}

#[test]
fn concurrent_reload_never_mixes_generations() {
    let registry = Arc::new(ReceiverRegistry::new(tagged_configuration("old")));
    let stop = Arc::new(AtomicBool::new(false));

    let writer = {
        let registry = Arc::clone(&registry);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut flip = false;
            while !stop.load(Ordering::Relaxed) {
                let generation = if flip { "old" } else { "new" };
                registry.replace(tagged_configuration(generation));
                flip = !flip;
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for i in 0..5_000 {
                    let name = format!("receiver-{}", i % 8);
                    let receiver = registry.lookup_receiver(&name).expect("receiver present");
                    let generation = generation_of(&receiver).to_string();
                    let mentions = receiver.mentions();

                    assert_eq!(receiver.fsurl, format!("https://hooks.example.com/{generation}"));
                    assert_eq!(mentions.mobiles, vec![format!("{generation}-mobile")]);
                    assert_eq!(mentions.emails, vec![format!("{generation}@example.com")]);

                    let snapshot = registry.snapshot();
                    let from_snapshot = snapshot.receiver(&name).expect("receiver present");
                    assert_eq!(snapshot.app_id, format!("{}-app", generation_of(&from_snapshot)));
                }
            })
        })
        .collect();

    for reader in readers {
        reader.join().expect("reader thread panicked");
    }
    stop.store(true, Ordering::Relaxed);
    writer.join().expect("writer thread panicked");
}

#[test]
fn failed_reload_from_missing_file_keeps_old_snapshot() {
    let registry = ReceiverRegistry::new(tagged_configuration("old"));
    let dir = tempfile::tempdir().unwrap();

    let err = registry.reload(dir.path().join("absent.yml")).unwrap_err();
    assert!(err.to_string().contains("absent.yml"));

    let receiver = registry.lookup_receiver("receiver-0").unwrap();
    assert_eq!(generation_of(&receiver), "old");
}
