use std::path::PathBuf;

use envbox::{component, config, toolbox, Component, ComponentError, Context, Contract, Factory};
use serde::{Deserialize, Serialize};

config! {
    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct Postgres {
        pub database: String => "env=PG_DB,default=postgres",
        pub host: String => "default=localhost",
        pub port: u16 => "default=5432",
        pub url: String,
    }
}
component!(config Postgres);

#[derive(Debug, Default)]
pub struct Mailer {
    pub sources: Vec<PathBuf>,
}

impl Component for Mailer {
    fn contract(&self) -> Contract {
        Contract::FILES
    }

    fn configure(&mut self, files: &[PathBuf]) -> Result<(), ComponentError> {
        self.sources = files.to_vec();
        Ok(())
    }
}
component!(Mailer, |mailer| mailer.sources.is_empty());

toolbox! {
    #[derive(Debug, Default)]
    pub struct Services {
        pub db: Postgres => "postgres",
        pub mailer: Mailer => "mail|smtp",
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    std::fs::write(
        dir.path().join("postgres.yml"),
        "host: db.internal\nurl: \"postgres://{{.host}}:{{.port}}/app\"\nport: 5432\n",
    )?;
    std::fs::write(dir.path().join("postgres.staging.toml"), "port = 6432\n")?;
    std::fs::write(dir.path().join("smtp.json"), r#"{"relay": "mx"}"#)?;

    let factory = Factory::new(Context::builder().environment("release/1.0").build());
    println!("{}", factory.context().resolve_environment().info());

    let mut services = Services::default();
    let report = factory.populate(&mut services, dir.path())?;

    print!("{report}");
    println!("{:#?}", services.db);
    Ok(())
}
