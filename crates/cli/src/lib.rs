//! Command-line surface of rcvec: builds a vector of handles to boxed values, adds aliased
//! handles, prints the values in slot order, then releases the vector and prints the order in
//! which the values were torn down.
use std::cell::RefCell;
use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;

use clap::{Arg, ArgMatches, Command};
use rcvec::{Boxed, Owner, Vector};

pub const FLAG_CAPACITY: &str = "capacity";
pub const FLAG_VALUES: &str = "values";
pub const FLAG_ALIASES: &str = "aliases";

const DEFAULT_CAPACITY: &str = "2";
const DEFAULT_VALUES: &str = "0,1,2,3";
const DEFAULT_ALIASES: &str = "2,1,0";

pub fn build_app<'a>() -> Command<'a> {
    let flag_capacity = Arg::new(FLAG_CAPACITY)
        .long(FLAG_CAPACITY)
        .help("Number of slots the vector starts with")
        .takes_value(true)
        .value_parser(clap::value_parser!(usize))
        .default_value(DEFAULT_CAPACITY);

    let flag_values = Arg::new(FLAG_VALUES)
        .long(FLAG_VALUES)
        .help("Comma-separated integers to box, one owned handle each")
        .takes_value(true)
        .allow_hyphen_values(true)
        .value_parser(clap::value_parser!(String))
        .default_value(DEFAULT_VALUES);

    let flag_aliases = Arg::new(FLAG_ALIASES)
        .long(FLAG_ALIASES)
        .help("Comma-separated slot indices to push again as extra references\n(Each alias may refer to any slot pushed before it.)")
        .takes_value(true)
        .value_parser(clap::value_parser!(String))
        .default_value(DEFAULT_ALIASES);

    Command::new("rcvec")
        .about("Shows shared ownership of boxed values stored as handles in a reference-counted vector")
        .arg(flag_capacity)
        .arg(flag_values)
        .arg(flag_aliases)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioConfig {
    pub capacity: usize,
    pub values: Vec<i64>,
    pub aliases: Vec<usize>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            capacity: 2,
            values: vec![0, 1, 2, 3],
            aliases: vec![2, 1, 0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigProblem {
    NotAnInteger { flag: &'static str, text: String },
    AliasOutOfRange { alias: usize, slots: usize },
}

impl fmt::Display for ConfigProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigProblem::NotAnInteger { flag, text } => {
                write!(f, "--{flag} expects comma-separated integers, but got {text:?}")
            }
            ConfigProblem::AliasOutOfRange { alias, slots } => write!(
                f,
                "--{FLAG_ALIASES} refers to slot {alias}, but only {slots} slots exist at that point"
            ),
        }
    }
}

impl std::error::Error for ConfigProblem {}

fn parse_list<N: std::str::FromStr>(flag: &'static str, text: &str) -> Result<Vec<N>, ConfigProblem> {
    text.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse().map_err(|_| ConfigProblem::NotAnInteger {
                flag,
                text: part.to_string(),
            })
        })
        .collect()
}

impl ScenarioConfig {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self, ConfigProblem> {
        let capacity = matches
            .get_one::<usize>(FLAG_CAPACITY)
            .copied()
            .unwrap_or_default();
        let values = match matches.get_one::<String>(FLAG_VALUES) {
            Some(text) => parse_list(FLAG_VALUES, text)?,
            None => Vec::new(),
        };
        let aliases = match matches.get_one::<String>(FLAG_ALIASES) {
            Some(text) => parse_list(FLAG_ALIASES, text)?,
            None => Vec::new(),
        };

        let config = Self {
            capacity,
            values,
            aliases,
        };
        config.check_aliases()?;

        Ok(config)
    }

    fn check_aliases(&self) -> Result<(), ConfigProblem> {
        let mut slots = self.values.len();

        for &alias in &self.aliases {
            if alias >= slots {
                return Err(ConfigProblem::AliasOutOfRange { alias, slots });
            }

            slots += 1;
        }

        Ok(())
    }
}

/// A boxed integer that reports when it is torn down.
struct Announced {
    number: i64,
    torn_down: Rc<RefCell<Vec<i64>>>,
}

impl Drop for Announced {
    fn drop(&mut self) {
        self.torn_down.borrow_mut().push(self.number);
    }
}

type Slot = Boxed<Announced>;

pub fn run_scenario(config: &ScenarioConfig, out: &mut impl Write) -> io::Result<()> {
    let torn_down = Rc::new(RefCell::new(Vec::new()));
    let vector: Owner<Vector> = unsafe { Owner::adopt(Vector::with_handles(config.capacity)) };

    for &value in &config.values {
        vector.push_handle(&Boxed::owned(Announced {
            number: value,
            torn_down: Rc::clone(&torn_down),
        }));
    }

    for &alias in &config.aliases {
        // Every slot of this vector holds a `Slot` handle, and the vector keeps it alive.
        match unsafe { vector.handle_at::<Slot>(alias) } {
            Some(handle) => unsafe {
                vector.push_ref(handle);
            },
            None => rcvec_error_macros::internal_error!(
                "alias {} was validated but slot {} is empty",
                alias,
                alias
            ),
        }
    }

    rcvec_tracing::info!(
        slots = vector.len(),
        capacity = vector.capacity(),
        "vector populated"
    );

    let mut visited = Vec::with_capacity(vector.len());
    vector.for_each(|slot, _| {
        let handle = unsafe { slot.cast::<Option<rcvec::Ref<Slot>>>().as_ptr().read() };
        if let Some(handle) = handle {
            visited.push(unsafe { handle.get() }.number);
        }

        false
    });

    for value in visited {
        writeln!(out, "{value}")?;
    }

    drop(vector);

    let torn_down = torn_down.borrow();
    let order: Vec<String> = torn_down.iter().map(i64::to_string).collect();
    writeln!(out, "torn down: {}", order.join(" "))?;

    Ok(())
}
