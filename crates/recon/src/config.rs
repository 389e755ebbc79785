use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::RunError;
use crate::keys::StrategyKind;

// ---------------------------------------------------------------------------
// Run config
// ---------------------------------------------------------------------------

/// Parameters for one run. Every field may come from a TOML file, flags or
/// the environment; see [`RunConfig::overlay`].
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub ledger_url: Option<String>,
    #[serde(default)]
    pub master_url: String,
    #[serde(default)]
    pub strategy: StrategyKind,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub preview_rows: usize,
}

/// Values that override a loaded [`RunConfig`] when present.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub year: Option<String>,
    pub ledger_url: Option<String>,
    pub master_url: Option<String>,
    pub strategy: Option<StrategyKind>,
    pub output_dir: Option<PathBuf>,
    pub preview_rows: Option<usize>,
}

impl RunConfig {
    pub fn from_toml(input: &str) -> Result<Self, RunError> {
        let mut config: RunConfig =
            toml::from_str(input).map_err(|e| RunError::ConfigParse(e.to_string()))?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides, then re-normalize.
    pub fn overlay(mut self, o: ConfigOverrides) -> Self {
        if let Some(year) = o.year {
            self.year = year;
        }
        if let Some(url) = o.ledger_url {
            self.ledger_url = Some(url);
        }
        if let Some(url) = o.master_url {
            self.master_url = url;
        }
        if let Some(strategy) = o.strategy {
            self.strategy = strategy;
        }
        if let Some(dir) = o.output_dir {
            self.output_dir = Some(dir);
        }
        if let Some(n) = o.preview_rows {
            self.preview_rows = n;
        }
        self.normalize();
        self
    }

    fn normalize(&mut self) {
        self.year = self.year.trim().to_string();
        self.master_url = self.master_url.trim().to_string();
        self.ledger_url = self
            .ledger_url
            .take()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());
    }

    /// Structural checks that do not depend on which pipeline runs.
    pub fn validate(&self) -> Result<(), RunError> {
        if self.year.contains(['/', '\\']) {
            return Err(RunError::ConfigValidation(format!(
                "year label \"{}\" must not contain path separators",
                self.year
            )));
        }
        Ok(())
    }

    /// Year, ledger and master locators are all required to join.
    pub fn require_join(&self) -> Result<(), RunError> {
        let mut missing = Vec::new();
        if self.year.is_empty() {
            missing.push("year");
        }
        if self.ledger_url.is_none() {
            missing.push("ledger_url");
        }
        if self.master_url.is_empty() {
            missing.push("master_url");
        }
        if !missing.is_empty() {
            return Err(RunError::MissingInput(missing));
        }
        self.validate()
    }

    /// Year and master locator are required for the rollup.
    pub fn require_rollup(&self) -> Result<(), RunError> {
        let mut missing = Vec::new();
        if self.year.is_empty() {
            missing.push("year");
        }
        if self.master_url.is_empty() {
            missing.push("master_url");
        }
        if !missing.is_empty() {
            return Err(RunError::MissingInput(missing));
        }
        self.validate()
    }

    /// Input echo for failure records.
    pub fn context(&self) -> BTreeMap<String, String> {
        let mut ctx = BTreeMap::new();
        ctx.insert("year".into(), self.year.clone());
        ctx.insert("master_url".into(), self.master_url.clone());
        if let Some(ref url) = self.ledger_url {
            ctx.insert("ledger_url".into(), url.clone());
        }
        ctx.insert("strategy".into(), self.strategy.to_string());
        ctx
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let config = RunConfig::from_toml(
            r#"
year = " 2016 "
ledger_url = "https://example.com/ledger.csv"
master_url = "https://example.com/master.csv"
strategy = "invoice_number"
output_dir = "out"
preview_rows = 5
"#,
        )
        .unwrap();
        assert_eq!(config.year, "2016");
        assert_eq!(config.strategy, StrategyKind::InvoiceNumber);
        assert_eq!(config.output_dir, Some(PathBuf::from("out")));
        assert_eq!(config.preview_rows, 5);
        config.require_join().unwrap();
    }

    #[test]
    fn strategy_defaults_to_amount_scheme() {
        let config = RunConfig::from_toml("year = \"2016\"\nmaster_url = \"m.csv\"\n").unwrap();
        assert_eq!(config.strategy, StrategyKind::DateContactAmount);
        assert!(config.require_rollup().is_ok());
    }

    #[test]
    fn unknown_strategy_rejected() {
        let err = RunConfig::from_toml("strategy = \"fuzzy\"\n").unwrap_err();
        assert!(matches!(err, RunError::ConfigParse(_)));
    }

    #[test]
    fn unknown_field_rejected() {
        let err = RunConfig::from_toml("yaer = \"2016\"\n").unwrap_err();
        assert!(matches!(err, RunError::ConfigParse(_)));
    }

    #[test]
    fn join_reports_every_missing_field() {
        let config = RunConfig::default();
        match config.require_join().unwrap_err() {
            RunError::MissingInput(fields) => {
                assert_eq!(fields, vec!["year", "ledger_url", "master_url"]);
            }
            other => panic!("expected MissingInput, got {other:?}"),
        }
    }

    #[test]
    fn blank_ledger_url_counts_as_missing() {
        let config = RunConfig::default().overlay(ConfigOverrides {
            year: Some("2016".into()),
            ledger_url: Some("   ".into()),
            master_url: Some("m.csv".into()),
            ..ConfigOverrides::default()
        });
        assert_eq!(config.ledger_url, None);
        assert!(matches!(config.require_join(), Err(RunError::MissingInput(f)) if f == vec!["ledger_url"]));
        assert!(config.require_rollup().is_ok());
    }

    #[test]
    fn overrides_win_over_file() {
        let config = RunConfig::from_toml("year = \"2015\"\nmaster_url = \"a.csv\"\n")
            .unwrap()
            .overlay(ConfigOverrides {
                year: Some("2016".into()),
                strategy: Some(StrategyKind::InvoiceNumber),
                ..ConfigOverrides::default()
            });
        assert_eq!(config.year, "2016");
        assert_eq!(config.master_url, "a.csv");
        assert_eq!(config.strategy, StrategyKind::InvoiceNumber);
    }

    #[test]
    fn year_with_separator_rejected() {
        let config = RunConfig::default().overlay(ConfigOverrides {
            year: Some("../2016".into()),
            master_url: Some("m.csv".into()),
            ..ConfigOverrides::default()
        });
        assert!(matches!(config.require_rollup(), Err(RunError::ConfigValidation(_))));
    }

    #[test]
    fn context_echoes_inputs() {
        let config = RunConfig::default().overlay(ConfigOverrides {
            year: Some("2016".into()),
            master_url: Some("m.csv".into()),
            ..ConfigOverrides::default()
        });
        let ctx = config.context();
        assert_eq!(ctx["year"], "2016");
        assert_eq!(ctx["master_url"], "m.csv");
        assert!(!ctx.contains_key("ledger_url"));
    }
}
