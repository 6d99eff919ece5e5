//! Declarative builder for command-line programs.
//!
//! A caller chains a program name, description, version and a list of
//! string-valued options onto a [`Program`], supplies one action callback,
//! and finishes with [`Program::parse`]: the library handles flag
//! splitting, help rendering and version output.
//!
//! The flag registry is owned by each program rather than being process
//! state, so any number of programs can be declared and parsed in one
//! process (tests included), and the deterministic core
//! ([`Program::parse_from`]) never prints or exits.

pub mod error {
    //! Error reporting for program configuration and parsing.

    use thiserror::Error;

    /// Crate-wide result alias.
    pub type Result<T> = std::result::Result<T, Error>;

    /// Errors raised while configuring a program or parsing an argument
    /// list.
    ///
    /// Configuration errors (`InvalidOptionSpec`, `FlagConflict`) are
    /// reported before any argument is consumed; the rest describe the
    /// first malformed token in the input.
    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    pub enum Error {
        /// A combined option specification could not be understood.
        #[error("invalid option spec '{spec}': {reason}")]
        InvalidOptionSpec { spec: String, reason: String },

        /// A flag spelling was bound more than once.
        #[error("flag bound more than once: {flag}")]
        FlagConflict { flag: String },

        /// A token looked like a flag but matches no bound spelling.
        #[error("unknown flag: {flag}")]
        UnknownFlag { flag: String },

        /// A value-taking flag appeared at the end of the argument list.
        #[error("missing value for {flag}")]
        MissingValue { flag: String },

        /// A value was attached to a flag that does not take one.
        #[error("flag does not take a value: {flag}")]
        UnexpectedValue { flag: String },
    }
}

pub mod flags {
    //! Scoped flag set: the token-splitting engine.
    //!
    //! A [`FlagSet`] is plain owned state: allocate destination slots,
    //! bind dashed spellings to them, parse one argument list, read the
    //! slots back. Several spellings may be bound to one slot, in which
    //! case they share the destination and the last matching token in the
    //! input wins.

    use std::collections::HashMap;

    use tracing::debug;

    use crate::error::{Error, Result};

    /// Handle to a destination slot allocated by a [`FlagSet`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SlotId(usize);

    #[derive(Debug, Clone)]
    struct Slot {
        value: String,
        takes_value: bool,
        present: bool,
    }

    /// An instance-owned set of bound flags.
    #[derive(Debug, Default)]
    pub struct FlagSet {
        slots: Vec<Slot>,
        bound: HashMap<String, usize>,
    }

    impl FlagSet {
        pub fn new() -> Self {
            Self::default()
        }

        /// Allocate a string slot holding `default` until a matching token
        /// overwrites it.
        pub fn string(&mut self, default: &str) -> SlotId {
            self.slots.push(Slot {
                value: default.to_string(),
                takes_value: true,
                present: false,
            });
            SlotId(self.slots.len() - 1)
        }

        /// Allocate a presence-only slot.
        pub fn switch(&mut self) -> SlotId {
            self.slots.push(Slot {
                value: String::new(),
                takes_value: false,
                present: false,
            });
            SlotId(self.slots.len() - 1)
        }

        /// Bind a dashed spelling (`-o` or `--output`) to a slot.
        ///
        /// Spellings are matched against input tokens verbatim, so they
        /// must carry their dashes. Binding a spelling twice is a
        /// configuration error, not a silent override.
        pub fn bind(&mut self, slot: SlotId, spelling: &str) -> Result<()> {
            if self.bound.insert(spelling.to_string(), slot.0).is_some() {
                return Err(Error::FlagConflict {
                    flag: spelling.to_string(),
                });
            }
            Ok(())
        }

        /// Final value of a slot.
        pub fn value(&self, slot: SlotId) -> &str {
            &self.slots[slot.0].value
        }

        /// Whether any spelling bound to the slot appeared in the input.
        pub fn present(&self, slot: SlotId) -> bool {
            self.slots[slot.0].present
        }

        /// Consume an argument list, writing matched values into bound
        /// slots.
        ///
        /// Returns the leftover positional tokens in input order. Flags
        /// and positionals may interleave. `--` ends flag recognition;
        /// everything after it is positional. A value-taking flag accepts
        /// `--flag value` and `--flag=value` (same for short spellings).
        /// Parsing stops at the first malformed token.
        pub fn parse<I>(&mut self, argv: I) -> Result<Vec<String>>
        where
            I: IntoIterator<Item = String>,
        {
            let mut positionals = Vec::new();
            let mut stream = argv.into_iter();
            let mut after_separator = false;

            while let Some(token) = stream.next() {
                if after_separator || token == "-" || !token.starts_with('-') {
                    positionals.push(token);
                    continue;
                }
                if token == "--" {
                    after_separator = true;
                    continue;
                }

                let (spelling, attached) = match token.split_once('=') {
                    Some((name, value)) => (name.to_string(), Some(value.to_string())),
                    None => (token, None),
                };
                let Some(&idx) = self.bound.get(&spelling) else {
                    return Err(Error::UnknownFlag { flag: spelling });
                };

                let slot = &mut self.slots[idx];
                slot.present = true;
                if slot.takes_value {
                    slot.value = match attached {
                        Some(value) => value,
                        None => stream
                            .next()
                            .ok_or(Error::MissingValue { flag: spelling })?,
                    };
                } else if attached.is_some() {
                    return Err(Error::UnexpectedValue { flag: spelling });
                }
            }

            debug!(
                bound = self.bound.len(),
                positionals = positionals.len(),
                "argument list consumed"
            );
            Ok(positionals)
        }
    }
}

pub mod program {
    //! Program declaration, help rendering and the terminal parse.

    use std::env;
    use std::process;

    use indexmap::IndexMap;
    use tracing::debug;

    use crate::error::{Error, Result};
    use crate::flags::{FlagSet, SlotId};

    /// Width of the option-name column in help output. A fixed layout
    /// constant, never computed from content.
    const HELP_NAME_WIDTH: usize = 40;

    /// One declared command-line option.
    ///
    /// Spellings are stored bare (no dashes); `key` names the entry the
    /// parsed value is stored under, independent of the spellings.
    #[derive(Debug, Clone, Default)]
    pub struct OptDef {
        short: Option<String>,
        long: Option<String>,
        key: String,
        help: String,
        default: String,
    }

    impl OptDef {
        /// Left column of this option's help line, e.g.
        /// `-o, --output <output>`.
        fn name_column(&self) -> String {
            let mut out = String::new();
            if let Some(short) = &self.short {
                out.push('-');
                out.push_str(short);
            }
            if self.short.is_some() && self.long.is_some() {
                out.push_str(", ");
            }
            if let Some(long) = &self.long {
                out.push_str("--");
                out.push_str(long);
            }
            out.push_str(&format!(" <{}>", self.key));
            out
        }
    }

    /// Strip dashes and whitespace from a declared spelling; empty means
    /// the spelling is absent.
    fn normalize(raw: &str) -> Option<String> {
        let bare = raw.trim().trim_start_matches('-');
        if bare.is_empty() {
            None
        } else {
            Some(bare.to_string())
        }
    }

    /// Split a combined option specification (`-s, --long <key>`, short or
    /// long alone) into its parts.
    fn split_spec(spec: &str) -> Result<(Option<String>, Option<String>, String)> {
        let invalid = |reason: &str| Error::InvalidOptionSpec {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = spec.trim();
        let Some((names, rest)) = trimmed.split_once('<') else {
            return Err(invalid("expected a '<key>' segment"));
        };
        let key = rest
            .strip_suffix('>')
            .ok_or_else(|| invalid("expected closing '>' after key"))?
            .trim();
        if key.is_empty() {
            return Err(invalid("key must not be empty"));
        }
        if names.trim().is_empty() {
            return Err(invalid("expected at least one of '-s' or '--long'"));
        }

        let mut short = None;
        let mut long = None;
        for name in names.split(',') {
            let name = name.trim();
            if let Some(bare) = name.strip_prefix("--") {
                if bare.is_empty() {
                    return Err(invalid("long name must not be empty"));
                }
                if long.replace(bare.to_string()).is_some() {
                    return Err(invalid("more than one long name"));
                }
            } else if let Some(bare) = name.strip_prefix('-') {
                if bare.chars().count() != 1 {
                    return Err(invalid("short name must be a single character"));
                }
                if short.replace(bare.to_string()).is_some() {
                    return Err(invalid("more than one short name"));
                }
            } else if name.is_empty() {
                return Err(invalid("empty name segment"));
            } else {
                return Err(invalid("names must start with '-' or '--'"));
            }
        }

        Ok((short, long, key.to_string()))
    }

    /// Parsed positional arguments and option values.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct Matches {
        arguments: Vec<String>,
        options: IndexMap<String, String>,
    }

    impl Matches {
        /// Leftover positional arguments, in input order.
        pub fn arguments(&self) -> &[String] {
            &self.arguments
        }

        /// Option values keyed by declaration key, in registration order.
        pub fn options(&self) -> &IndexMap<String, String> {
            &self.options
        }

        /// Final value for one option key.
        pub fn get(&self, key: &str) -> Option<&str> {
            self.options.get(key).map(String::as_str)
        }

        /// Split into the pieces handed to an action.
        pub fn into_parts(self) -> (Vec<String>, IndexMap<String, String>) {
            (self.arguments, self.options)
        }
    }

    /// Result of a finished parse, before any terminal I/O happens.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Outcome {
        /// Invoke the action with these matches.
        Run(Matches),
        /// Print the rendered help text and stop; the action never runs.
        Help(String),
        /// Print the configured version string and stop; the action never
        /// runs. The carried string has no trailing newline; the terminal
        /// printer appends one.
        Version(String),
    }

    /// Caller-supplied terminal function, invoked with the positional
    /// arguments (input order) and the option table (registration order).
    pub type Action = Box<dyn FnOnce(Vec<String>, IndexMap<String, String>)>;

    /// A declarative command-line program.
    ///
    /// Configuration accumulates through chained setters, each taking and
    /// returning the program by value. The terminal [`parse`](Program::parse)
    /// consumes the program, so a finished program cannot be reconfigured
    /// or re-run.
    #[derive(Default)]
    pub struct Program {
        name: String,
        description: String,
        version: String,
        options: Vec<OptDef>,
        action: Option<Action>,
        error: Option<Error>,
    }

    impl Program {
        /// An empty program with nothing configured.
        pub fn new() -> Self {
            Self::default()
        }

        /// Set the program name shown in the usage line.
        pub fn name(mut self, name: impl Into<String>) -> Self {
            self.name = name.into();
            self
        }

        /// Set the description shown in help output.
        pub fn description(mut self, description: impl Into<String>) -> Self {
            self.description = description.into();
            self
        }

        /// Set the version string reported by `-v`/`--version`.
        ///
        /// Without a configured version the reserved version flags are not
        /// bound at all, and `v`/`version` stay free for regular options.
        pub fn version(mut self, version: impl Into<String>) -> Self {
            self.version = version.into();
            self
        }

        /// Declare an option.
        ///
        /// `short` and `long` are flag spellings, with or without their
        /// dashes; an empty string means the spelling is absent. `key`
        /// names the entry the parsed value is stored under. Nothing is
        /// validated here: an option with no spelling is reachable only
        /// through its default, and when two options share a key the later
        /// registration wins in the parsed table.
        pub fn option(
            mut self,
            short: &str,
            long: &str,
            key: &str,
            help: &str,
            default: &str,
        ) -> Self {
            self.options.push(OptDef {
                short: normalize(short),
                long: normalize(long),
                key: key.to_string(),
                help: help.to_string(),
                default: default.to_string(),
            });
            self
        }

        /// Declare an option from a combined specification string.
        ///
        /// Accepted forms are `-s <key>`, `--long <key>` and
        /// `-s, --long <key>`. A malformed specification is recorded as
        /// [`Error::InvalidOptionSpec`] and returned by the next parse
        /// before any flag is bound; the chain itself stays usable, and
        /// the first recorded error wins.
        pub fn option_spec(mut self, spec: &str, help: &str, default: &str) -> Self {
            match split_spec(spec) {
                Ok((short, long, key)) => self.options.push(OptDef {
                    short,
                    long,
                    key,
                    help: help.to_string(),
                    default: default.to_string(),
                }),
                Err(err) => {
                    self.error.get_or_insert(err);
                }
            }
            self
        }

        /// Set the action invoked with `(arguments, options)` after a
        /// successful parse.
        pub fn action<F>(mut self, action: F) -> Self
        where
            F: FnOnce(Vec<String>, IndexMap<String, String>) + 'static,
        {
            self.action = Some(Box::new(action));
            self
        }

        /// Render the full help text.
        ///
        /// Deterministic and side-effect free; this is also what the
        /// terminal parse prints for `-h`/`--help` and on malformed input.
        pub fn help_text(&self) -> String {
            let mut out = format!("Usage: {} [options] [arguments]\n", self.name);

            if !self.description.is_empty() {
                out.push_str(&format!("\n{}\n", self.description));
            }

            out.push_str("\nOptions:\n");

            for opt in &self.options {
                out.push_str(&format!(
                    "  {:<width$}{}",
                    opt.name_column(),
                    opt.help,
                    width = HELP_NAME_WIDTH
                ));
                if opt.default.is_empty() {
                    out.push('\n');
                } else {
                    out.push_str(&format!(" (default: \"{}\")\n", opt.default));
                }
            }

            if !self.version.is_empty() {
                out.push_str(&format!(
                    "  {:<width$}{}\n",
                    "-v, --version",
                    "output the version number",
                    width = HELP_NAME_WIDTH
                ));
            }
            out.push_str(&format!(
                "  {:<width$}{}\n",
                "-h, --help",
                "display help for command",
                width = HELP_NAME_WIDTH
            ));

            out
        }

        /// Parse an explicit argument list without touching the process.
        ///
        /// The list excludes the program name (`argv[1..]`). Returns any
        /// deferred configuration error first; otherwise binds every
        /// declared option plus the reserved flags into a fresh
        /// [`FlagSet`], runs it, and reports the outcome. Help wins over
        /// version when both flags are present. No I/O happens here and
        /// the action is not invoked; this is the testing surface.
        pub fn parse_from<I, S>(&self, argv: I) -> Result<Outcome>
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            if let Some(err) = &self.error {
                return Err(err.clone());
            }

            let mut set = FlagSet::new();
            let mut slots: Vec<SlotId> = Vec::with_capacity(self.options.len());
            for opt in &self.options {
                let slot = set.string(&opt.default);
                if let Some(short) = &opt.short {
                    set.bind(slot, &format!("-{short}"))?;
                }
                if let Some(long) = &opt.long {
                    set.bind(slot, &format!("--{long}"))?;
                }
                slots.push(slot);
            }

            let mut version = None;
            if !self.version.is_empty() {
                let slot = set.switch();
                set.bind(slot, "-v")?;
                set.bind(slot, "--version")?;
                version = Some(slot);
            }

            let help = set.switch();
            set.bind(help, "-h")?;
            set.bind(help, "--help")?;

            debug!(options = self.options.len(), "flag set bound");

            let arguments = set.parse(argv.into_iter().map(Into::into))?;

            if set.present(help) {
                return Ok(Outcome::Help(self.help_text()));
            }
            if let Some(slot) = version {
                if set.present(slot) {
                    return Ok(Outcome::Version(self.version.clone()));
                }
            }

            let mut options = IndexMap::with_capacity(self.options.len());
            for (opt, slot) in self.options.iter().zip(&slots) {
                options.insert(opt.key.clone(), set.value(*slot).to_string());
            }

            Ok(Outcome::Run(Matches { arguments, options }))
        }

        /// Parse an explicit argument list and, on a run outcome, invoke
        /// the action.
        ///
        /// Unlike [`parse`](Program::parse) this never prints or exits:
        /// help and version outcomes are returned to the caller unprinted,
        /// and malformed input comes back as an error.
        pub fn run_from<I, S>(mut self, argv: I) -> Result<Outcome>
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            let outcome = self.parse_from(argv)?;
            if let Outcome::Run(matches) = &outcome {
                if let Some(action) = self.action.take() {
                    let (arguments, options) = matches.clone().into_parts();
                    action(arguments, options);
                }
            }
            Ok(outcome)
        }

        /// Parse the real process arguments and dispatch. The terminal
        /// operation: it consumes the program.
        ///
        /// `-h`/`--help` prints the help text and exits 0. `-v`/`--version`
        /// (when a version is configured) prints the version string and
        /// exits 0. Malformed input prints the error and the help text to
        /// stderr and exits 2. Otherwise the action runs with the parsed
        /// arguments and options, and this returns when it returns.
        pub fn parse(self) {
            let usage = self.help_text();
            let argv: Vec<String> = env::args().skip(1).collect();
            match self.run_from(argv) {
                Ok(Outcome::Help(text)) => {
                    print!("{text}");
                    process::exit(0);
                }
                Ok(Outcome::Version(version)) => {
                    println!("{version}");
                    process::exit(0);
                }
                Ok(Outcome::Run(_)) => {}
                Err(err) => {
                    eprintln!("error: {err}");
                    eprint!("{usage}");
                    process::exit(2);
                }
            }
        }
    }
}

pub use error::{Error, Result};
pub use flags::{FlagSet, SlotId};
pub use program::{Action, Matches, OptDef, Outcome, Program};
