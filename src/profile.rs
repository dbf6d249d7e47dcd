//! Dataset profiles.
//!
//! A [`Profile`] names everything that differs between Smart Location
//! Database releases and extracts: which layer to load, which columns are
//! identifiers, which bounded indexes need repair, the aggregates to compute
//! (each with an optional fallback column for schema drift), and the output
//! file names. Two profiles are built in; others can be loaded from YAML.

use std::{
    fs::File,
    io::{Read, Write},
    path::Path,
};

use anyhow::{Context, Result, ensure};
use clap::ValueEnum;
use log::info;
use serde::{Deserialize, Serialize};

use crate::cli::ProfileArgs;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum BuiltinProfile {
    /// Transit accessibility layer (CBG_Trans45)
    #[default]
    Transit,
    /// Smart Location walkability extract
    Walkability,
}

/// A preferred column with an optional stand-in for older releases.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnChoice {
    pub primary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

impl ColumnChoice {
    pub fn new(primary: &str) -> Self {
        Self {
            primary: primary.to_string(),
            fallback: None,
        }
    }

    pub fn with_fallback(primary: &str, fallback: &str) -> Self {
        Self {
            primary: primary.to_string(),
            fallback: Some(fallback.to_string()),
        }
    }

    /// Picks the primary column when present, otherwise the fallback.
    pub fn resolve<'a>(&'a self, has_column: impl Fn(&str) -> bool) -> Option<&'a str> {
        if has_column(&self.primary) {
            return Some(&self.primary);
        }
        self.fallback.as_deref().filter(|name| has_column(name))
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AggregateKind {
    #[default]
    Mean,
    /// Mean of a state code, collapsed to an integer or `0` when the group
    /// spans several states.
    StateCode,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AggregateSpec {
    pub name: String,
    pub source: ColumnChoice,
    #[serde(default)]
    pub kind: AggregateKind,
}

impl AggregateSpec {
    pub fn mean(name: &str, source: ColumnChoice) -> Self {
        Self {
            name: name.to_string(),
            source,
            kind: AggregateKind::Mean,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputFiles {
    pub cleaned_csv: String,
    pub aggregate_csv: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geojson: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    /// Layer (file stem) to look for inside an archive.
    pub layer: String,
    pub identifiers: Vec<String>,
    pub group_key: String,
    pub count_column: ColumnChoice,
    #[serde(default)]
    pub bounded_indexes: Vec<String>,
    #[serde(default = "default_true")]
    pub drop_shape_columns: bool,
    pub aggregates: Vec<AggregateSpec>,
    pub outputs: OutputFiles,
}

fn default_true() -> bool {
    true
}

const SLD_IDENTIFIERS: &[&str] = &["CBSA_Name", "CBSA", "GEOID10", "CBG_ID"];

impl Profile {
    pub fn builtin(kind: BuiltinProfile) -> Self {
        match kind {
            BuiltinProfile::Transit => Self::transit(),
            BuiltinProfile::Walkability => Self::walkability(),
        }
    }

    pub fn transit() -> Self {
        Profile {
            name: "transit".to_string(),
            layer: "CBG_Trans45".to_string(),
            identifiers: SLD_IDENTIFIERS.iter().map(|s| s.to_string()).collect(),
            group_key: "CBSA_Name".to_string(),
            count_column: ColumnChoice::with_fallback("GEOID10", "CBG_ID"),
            bounded_indexes: vec!["TrAccess_Index".to_string()],
            drop_shape_columns: true,
            aggregates: vec![
                AggregateSpec::mean("avg_access", ColumnChoice::new("TrAccess_Index")),
                AggregateSpec::mean(
                    "avg_pop",
                    ColumnChoice::with_fallback("Pct_Pop_byTr_av", "Pct_Pop_byTr"),
                ),
                AggregateSpec::mean(
                    "avg_jobs",
                    ColumnChoice::with_fallback("Pct_Jobs_byTr_av", "Pct_Jobs_byTr"),
                ),
                AggregateSpec::mean(
                    "avg_LoWgWrks_byTr",
                    ColumnChoice::new("pct_LoWgWrks_byTr"),
                ),
                AggregateSpec::mean(
                    "avg_MeWgWrks_byTr",
                    ColumnChoice::new("pct_MeWgWrks_byTr"),
                ),
                AggregateSpec {
                    name: "state_fips".to_string(),
                    source: ColumnChoice::new("STATEFP"),
                    kind: AggregateKind::StateCode,
                },
            ],
            outputs: OutputFiles {
                cleaned_csv: "cleaned_transit_data.csv".to_string(),
                aggregate_csv: "metro_aggregated.csv".to_string(),
                geojson: Some("cleaned_transit_data.geojson".to_string()),
            },
        }
    }

    pub fn walkability() -> Self {
        Profile {
            name: "walkability".to_string(),
            layer: "smartlocation".to_string(),
            identifiers: SLD_IDENTIFIERS.iter().map(|s| s.to_string()).collect(),
            group_key: "CBSA_Name".to_string(),
            count_column: ColumnChoice::with_fallback("GEOID10", "CBG_ID"),
            bounded_indexes: vec!["NatWalkInd".to_string()],
            drop_shape_columns: false,
            aggregates: vec![
                AggregateSpec::mean("avg_D1B", ColumnChoice::new("D1B")),
                AggregateSpec::mean("avg_NWI", ColumnChoice::new("NatWalkInd")),
                AggregateSpec::mean("avg_pct_zero_car_HH", ColumnChoice::new("Pct_AO0")),
            ],
            outputs: OutputFiles {
                cleaned_csv: "cleaned_smart_data.csv".to_string(),
                aggregate_csv: "smart_aggregated.csv".to_string(),
                geojson: None,
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.layer.trim().is_empty(), "Profile '{}' has an empty layer name", self.name);
        ensure!(
            self.identifiers.contains(&self.group_key),
            "Group key '{}' must be listed as an identifier column",
            self.group_key
        );
        let mut names = Vec::with_capacity(self.aggregates.len());
        for aggregate in &self.aggregates {
            ensure!(
                !aggregate.name.trim().is_empty(),
                "Aggregate names cannot be empty"
            );
            ensure!(
                aggregate.name != self.group_key && aggregate.name != crate::aggregate::COUNT_COLUMN,
                "Aggregate name '{}' collides with a reserved column",
                aggregate.name
            );
            ensure!(
                !names.contains(&aggregate.name),
                "Aggregate '{}' is declared more than once",
                aggregate.name
            );
            names.push(aggregate.name.clone());
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let mut file = File::open(path).with_context(|| format!("Opening profile {path:?}"))?;
        let mut raw = String::new();
        file.read_to_string(&mut raw)
            .with_context(|| format!("Reading profile {path:?}"))?;
        let profile = Self::from_yaml(&raw).with_context(|| format!("Parsing profile {path:?}"))?;
        Ok(profile)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        let profile: Profile = serde_yaml::from_str(raw)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = self.to_yaml()?;
        let mut file = File::create(path).with_context(|| format!("Creating profile {path:?}"))?;
        file.write_all(serialized.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

/// Writes a built-in profile as YAML to `--output`, or to stdout.
pub fn execute(args: &ProfileArgs) -> Result<()> {
    let profile = Profile::builtin(args.profile);
    match &args.output {
        Some(path) => {
            profile.save(path)?;
            info!("Profile '{}' written to {}", profile.name, path.display());
        }
        None => print!("{}", profile.to_yaml()?),
    }
    Ok(())
}
