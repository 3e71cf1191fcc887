//! Simulation settings and command-line parsing.

use thiserror::Error;

use crate::types::{DEFAULT_CAPACITY, Discipline};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown argument: {0}")]
    UnknownArgument(String),
    #[error("{flag} expects a value")]
    MissingValue { flag: String },
    #[error("{flag}: invalid number: {value}")]
    InvalidNumber { flag: String, value: String },
    #[error("{0} must be > 0")]
    Zero(&'static str),
}

/// Settings for one simulation run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimConfig {
    pub suppliers: usize,
    pub customers: usize,
    pub requests_per_role: usize,
    pub discipline: Discipline,
    pub capacity: usize,
    /// Fixed seed for reproducible request streams; entropy when unset.
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            suppliers: 10,
            customers: 10,
            requests_per_role: 100,
            discipline: Discipline::Coarse,
            capacity: DEFAULT_CAPACITY,
            seed: None,
        }
    }
}

/// Settings for the `bench` sweep.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BenchConfig {
    pub sim: SimConfig,
    pub repeat: usize,
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: Option<String>) -> Result<T, ConfigError> {
    let value = value.ok_or_else(|| ConfigError::MissingValue {
        flag: flag.to_string(),
    })?;
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidNumber {
        flag: flag.to_string(),
        value,
    })
}

impl SimConfig {
    /// Parse run flags; anything not recognised is handed to `extra`, which
    /// returns false to reject it.
    fn parse_with<I, F>(args: I, mut extra: F) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = String>,
        F: FnMut(&str, &mut I::IntoIter) -> Result<bool, ConfigError>,
    {
        let mut config = SimConfig::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--fine" => config.discipline = Discipline::Fine,
                "--coarse" => config.discipline = Discipline::Coarse,
                "--suppliers" => config.suppliers = parse_number(&arg, args.next())?,
                "--customers" => config.customers = parse_number(&arg, args.next())?,
                "--requests" => config.requests_per_role = parse_number(&arg, args.next())?,
                "--capacity" => config.capacity = parse_number(&arg, args.next())?,
                "--seed" => config.seed = Some(parse_number(&arg, args.next())?),
                other => {
                    if !extra(other, &mut args)? {
                        return Err(ConfigError::UnknownArgument(other.to_string()));
                    }
                }
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Parse the flags of a plain simulation run (program name excluded).
    pub fn from_args<I>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        Self::parse_with(args, |_, _| Ok(false))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.suppliers == 0 {
            return Err(ConfigError::Zero("suppliers"));
        }
        if self.customers == 0 {
            return Err(ConfigError::Zero("customers"));
        }
        if self.capacity == 0 {
            return Err(ConfigError::Zero("capacity"));
        }
        Ok(())
    }
}

impl BenchConfig {
    /// Parse the flags following `bench`.
    pub fn from_args<I>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut repeat = 1usize;
        let sim = SimConfig::parse_with(args, |flag, rest| {
            if flag != "--repeat" {
                return Ok(false);
            }
            repeat = parse_number(flag, rest.next())?;
            Ok(true)
        })?;
        if repeat == 0 {
            return Err(ConfigError::Zero("repeat"));
        }
        Ok(Self { sim, repeat })
    }
}
