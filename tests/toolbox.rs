use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use envbox::{
    component, config, toolbox, Component, ComponentError, ConfigError, Context, Contract, Error,
    Factory, Outcome, Report,
};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

config! {
    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct Database {
        pub database: String => "env=ENVBOX_IT_PG_DB,default=postgres",
        pub host: String,
        pub port: u16 => "default=5432",
    }
}
component!(config Database);

config! {
    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct Service {
        pub host: String,
        pub port: u16,
    }
}
component!(config Service);

config! {
    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct Credentials {
        pub user: String => "required",
        pub password: String,
    }
}
component!(config Credentials);

/// Configurable only as a collection element.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Worker {
    pub name: String,
    pub threads: u64,
}

impl Component for Worker {
    fn contract(&self) -> Contract {
        Contract::BYTES
    }

    fn configure_bytes(&mut self, bytes: &[u8]) -> Result<(), ComponentError> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        self.name = value["name"].as_str().ok_or("worker needs a name")?.to_string();
        self.threads = value["threads"].as_u64().unwrap_or(1);
        Ok(())
    }
}

/// Counts configuration calls.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Recorder {
    pub calls: usize,
    pub files: Vec<PathBuf>,
}

impl Component for Recorder {
    fn contract(&self) -> Contract {
        Contract::FILES
    }

    fn configure(&mut self, files: &[PathBuf]) -> Result<(), ComponentError> {
        self.calls += 1;
        self.files = files.to_vec();
        Ok(())
    }
}
component!(Recorder, |recorder| recorder.calls == 0);

#[derive(Debug, Default, PartialEq)]
pub struct Broken;

impl Component for Broken {
    fn contract(&self) -> Contract {
        Contract::FILES
    }

    fn configure(&mut self, _files: &[PathBuf]) -> Result<(), ComponentError> {
        Err("connection refused".into())
    }
}
component!(Broken);

#[derive(Debug, Default, PartialEq)]
pub struct Inert;

impl Component for Inert {
    fn contract(&self) -> Contract {
        Contract::NONE
    }
}
component!(Inert);

toolbox! {
    #[derive(Debug, Default)]
    pub struct Storage {
        pub db: Database => "postgres",
        pub recorder: Recorder,
    }
}

toolbox! {
    #[derive(Debug, Default)]
    pub struct App {
        pub svc: Service,
        pub storage: Option<Storage>,
        pub workers: Vec<Worker>,
        pub cache: Recorder => "omit",
        pub inert: Inert,
        pub retries: u32,
        pub timeout: Option<u64>,
    }
}

toolbox! {
    #[derive(Debug, Default)]
    pub struct Fragile {
        pub svc: Service,
        pub broken: Broken,
        pub after: Recorder,
    }
}

fn factory(environment: &str) -> Factory {
    Factory::new(
        Context::builder()
            .environment(environment)
            .env_var("ENVBOX_IT_UNSET_BUILD_ENV")
            .build(),
    )
}

fn write(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

fn app_fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "svc.yml", "host: example.com\nport: 80\n");
    write(dir.path(), "svc.production.yml", "port: 443\n");
    write(dir.path(), "postgres.toml", "host = \"db.internal\"\n");
    write(
        dir.path(),
        "workers.yaml",
        "- name: mailer\n  threads: 4\n- name: indexer\n",
    );
    write(dir.path(), "cache.json", r#"{"size": 128}"#);
    dir
}

#[test]
fn test_overlay_wins_and_bare_keys_survive() {
    let dir = app_fixture();
    let mut app = App::default();
    factory("production").populate(&mut app, dir.path()).unwrap();

    assert_eq!(app.svc.port, 443);
    assert_eq!(app.svc.host, "example.com");

    let mut app = App::default();
    factory("local").populate(&mut app, dir.path()).unwrap();
    assert_eq!(app.svc.port, 80);
}

#[test]
fn test_env_and_default_directives() {
    let dir = app_fixture();

    let mut app = App::default();
    factory("local").populate(&mut app, dir.path()).unwrap();
    let db = &app.storage.as_ref().unwrap().db;
    assert_eq!(db.database, "postgres");
    assert_eq!(db.host, "db.internal");
    assert_eq!(db.port, 5432);

    std::env::set_var("ENVBOX_IT_PG_DB", "orders");
    let mut app = App::default();
    let result = factory("local").populate(&mut app, dir.path());
    std::env::remove_var("ENVBOX_IT_PG_DB");

    result.unwrap();
    assert_eq!(app.storage.unwrap().db.database, "orders");
}

#[test]
fn test_element_contract_builds_each_entry_in_order() {
    let dir = app_fixture();
    let mut app = App::default();
    factory("local").populate(&mut app, dir.path()).unwrap();

    assert_eq!(
        app.workers,
        [
            Worker {
                name: "mailer".into(),
                threads: 4
            },
            Worker {
                name: "indexer".into(),
                threads: 1
            },
        ]
    );
}

#[test]
fn test_map_collection_of_config_components() {
    toolbox! {
        #[derive(Default)]
        struct Cluster {
            nodes: BTreeMap<String, Service> => "nodes",
        }
    }

    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "nodes.yml",
        "primary:\n  host: a\n  port: 1\nreplica:\n  host: b\n  port: 2\n",
    );

    let mut cluster = Cluster::default();
    factory("local").populate(&mut cluster, dir.path()).unwrap();
    assert_eq!(cluster.nodes.len(), 2);
    assert_eq!(cluster.nodes["replica"].host, "b");
    assert_eq!(cluster.nodes["primary"].port, 1);
}

#[test]
fn test_omitted_field_is_never_touched() {
    let dir = app_fixture();
    let mut app = App::default();
    let report = factory("local").populate(&mut app, dir.path()).unwrap();

    assert_eq!(app.cache, Recorder::default());
    assert_eq!(report.outcome("cache"), Some(&Outcome::Omitted));
}

#[test]
fn test_non_zero_fields_are_unchanged() {
    let dir = app_fixture();
    let preset = Service {
        host: "preset.local".into(),
        port: 8080,
    };
    let mut app = App {
        svc: preset.clone(),
        retries: 7,
        ..App::default()
    };

    let report = factory("production").populate(&mut app, dir.path()).unwrap();
    assert_eq!(app.svc, preset);
    assert_eq!(app.retries, 7);
    assert_eq!(report.outcome("svc"), Some(&Outcome::Preset));
}

#[test]
fn test_components_are_configured_exactly_once() {
    let dir = app_fixture();
    let mut app = App::default();
    let report = factory("local").populate(&mut app, dir.path()).unwrap();

    let storage = app.storage.as_ref().unwrap();
    assert_eq!(storage.recorder.calls, 1);
    assert!(storage.recorder.files.is_empty());
    assert_eq!(report.outcome("storage"), Some(&Outcome::Namespace));
    assert_eq!(
        report.outcome("storage.recorder"),
        Some(&Outcome::Loaded(Vec::new()))
    );
}

#[test]
fn test_not_configurable_and_scalars() {
    let dir = app_fixture();
    let mut app = App::default();
    let report = factory("local").populate(&mut app, dir.path()).unwrap();

    assert_eq!(report.outcome("inert"), Some(&Outcome::NotConfigurable));
    assert_eq!(report.outcome("retries"), None);
    assert_eq!(app.timeout, None);
    assert_eq!(report.environment, "local");
}

#[test]
fn test_required_field_is_named() {
    toolbox! {
        #[derive(Default)]
        struct Secrets {
            creds: Credentials,
        }
    }

    let dir = TempDir::new().unwrap();
    write(dir.path(), "creds.json", r#"{"password": "hunter2"}"#);

    let mut secrets = Secrets::default();
    let err = factory("local")
        .populate(&mut secrets, dir.path())
        .unwrap_err();
    assert_eq!(err.missing_field(), Some("user"));
}

#[test]
fn test_component_error_aborts_without_rollback() {
    let dir = app_fixture();
    let mut fragile = Fragile::default();
    let mut report = Report::default();

    let err = factory("production")
        .populate_into(&mut fragile, dir.path(), &mut report)
        .unwrap_err();

    match &err {
        Error::Component { field, source } => {
            assert_eq!(field, "broken");
            assert_eq!(source.to_string(), "connection refused");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fragile.svc.port, 443);
    assert_eq!(fragile.after.calls, 0);
    assert!(matches!(report.outcome("broken"), Some(Outcome::Failed(_))));
    assert_eq!(report.outcome("after"), None);
}

#[test]
fn test_collection_without_files_fails() {
    let dir = TempDir::new().unwrap();
    let mut app = App {
        svc: Service {
            host: "x".into(),
            port: 1,
        },
        ..App::default()
    };
    write(dir.path(), "postgres.yml", "host: db\n");

    let err = factory("local").populate(&mut app, dir.path()).unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::FileNotFound { ref names, .. }) if names == "workers"
    ));
}

#[test]
fn test_invalid_root() {
    let mut number = 5u32;
    let err = factory("local")
        .populate(&mut number, Path::new("."))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidRoot(_)));

    let mut missing: Option<App> = None;
    let err = factory("local")
        .populate(&mut missing, Path::new("."))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidRoot(_)));
}

config! {
    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct Limits {
        pub burst: u32,
        pub ratio: f64,
    }
}

config! {
    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct Settings {
        pub name: String,
        pub enabled: bool,
        pub hosts: Vec<String>,
        pub labels: BTreeMap<String, String>,
        pub limits: Limits,
    }
}
component!(config Settings);

#[test]
fn test_encoded_value_round_trips_through_engine() {
    toolbox! {
        #[derive(Default)]
        struct Root {
            settings: Settings,
        }
    }

    let original = Settings {
        name: "api".into(),
        enabled: true,
        hosts: vec!["a.example".into(), "b.example".into()],
        labels: BTreeMap::from([("team".into(), "core".into()), ("tier".into(), "1".into())]),
        limits: Limits {
            burst: 20,
            ratio: 0.5,
        },
    };

    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "settings.yaml",
        &serde_yaml::to_string(&original).unwrap(),
    );

    let mut root = Root::default();
    factory("testing").populate(&mut root, dir.path()).unwrap();
    assert_eq!(root.settings, original);
}

#[test]
fn test_pipe_names_load_in_declaration_order() {
    toolbox! {
        #[derive(Default)]
        struct Mail {
            relay: Recorder => "a|b",
        }
    }

    let dir = TempDir::new().unwrap();
    for name in ["a.yml", "a.production.yml", "b.yml", "b.production.yml", "b.staging.yml"] {
        write(dir.path(), name, "host: mx\n");
    }

    let mut mail = Mail::default();
    let report = factory("production").populate(&mut mail, dir.path()).unwrap();

    let expected: Vec<PathBuf> = ["a.yml", "a.production.yml", "b.yml", "b.production.yml"]
        .iter()
        .map(|name| dir.path().join(name))
        .collect();
    assert_eq!(report.outcome("relay"), Some(&Outcome::Loaded(expected.clone())));
    assert_eq!(mail.relay.files, expected);
    assert_eq!(mail.relay.calls, 1);
}

#[test]
fn test_value_directives_on_toolbox_field_are_ignored() {
    toolbox! {
        #[derive(Default)]
        struct Edge {
            svc: Service => "env=ENVBOX_IT_EDGE_SVC,default=ignored,required",
        }
    }

    let dir = TempDir::new().unwrap();
    write(dir.path(), "svc.yml", "host: edge\nport: 8443\n");

    let mut edge = Edge::default();
    let report = factory("local").populate(&mut edge, dir.path()).unwrap();
    assert_eq!(edge.svc.host, "edge");
    assert_eq!(
        report.outcome("svc"),
        Some(&Outcome::Loaded(vec![dir.path().join("svc.yml")]))
    );
}
