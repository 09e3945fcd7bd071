//! Infrastructure detection from dependencies and application config.

use crate::inventory::{BrokerKind, DatabaseFamily, Dependency, Infrastructure};

const RELATIONAL_MARKERS: &[&str] = &[
    "data-jpa",
    "jdbc",
    "postgresql",
    "mysql",
    "mariadb",
    "ojdbc",
    "hibernate",
    "flyway",
    "liquibase",
];
const DOCUMENT_MARKERS: &[&str] = &["mongodb", "couchbase", "cassandra"];
const CACHE_MARKERS: &[&str] = &["redis", "cache", "caffeine", "hazelcast", "ehcache"];

fn broker_for(text: &str) -> Option<BrokerKind> {
    if text.contains("kafka") {
        Some(BrokerKind::Kafka)
    } else if text.contains("amqp") || text.contains("rabbit") {
        Some(BrokerKind::RabbitMq)
    } else if text.contains("activemq") || text.contains("artemis") || text.contains("jms") {
        Some(BrokerKind::ActiveMq)
    } else {
        None
    }
}

fn note_database(infra: &mut Infrastructure, family: DatabaseFamily) {
    // Relational usage dominates when both families appear.
    if infra.database != Some(DatabaseFamily::Relational) {
        infra.database = Some(family);
    }
}

/// Update `infra` from the declared dependency list.
pub(crate) fn detect_from_dependencies(dependencies: &[Dependency], infra: &mut Infrastructure) {
    for dep in dependencies {
        let name = dep.name.to_lowercase();

        if name == "h2" || RELATIONAL_MARKERS.iter().any(|m| name.contains(m)) {
            note_database(infra, DatabaseFamily::Relational);
        } else if DOCUMENT_MARKERS.iter().any(|m| name.contains(m)) {
            note_database(infra, DatabaseFamily::Document);
        }

        if infra.broker.is_none() {
            infra.broker = broker_for(&name);
        }

        if CACHE_MARKERS.iter().any(|m| name.contains(m)) {
            infra.cache = true;
        }
    }
}

/// Update `infra` from an `application.properties` / `application.yml` body.
pub(crate) fn detect_from_config(content: &str, infra: &mut Infrastructure) {
    let text = content.to_lowercase();

    if text.contains("jdbc:") || text.contains("datasource") {
        note_database(infra, DatabaseFamily::Relational);
    } else if text.contains("mongodb") {
        note_database(infra, DatabaseFamily::Document);
    }

    if infra.broker.is_none() {
        infra.broker = if text.contains("kafka") {
            Some(BrokerKind::Kafka)
        } else if text.contains("rabbitmq") {
            Some(BrokerKind::RabbitMq)
        } else if text.contains("activemq") || text.contains("artemis") {
            Some(BrokerKind::ActiveMq)
        } else {
            None
        };
    }

    if text.contains("redis") || text.contains("spring.cache") || text.contains("cache:") {
        infra.cache = true;
    }
}

/// Whether a file name is a Spring-style application config file.
pub(crate) fn is_config_file(file_name: &str) -> bool {
    file_name.starts_with("application")
        && (file_name.ends_with(".properties")
            || file_name.ends_with(".yml")
            || file_name.ends_with(".yaml"))
}
