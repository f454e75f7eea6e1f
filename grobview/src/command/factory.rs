//! Name-indexed registry of command constructors
use std::collections::BTreeMap;

use super::{Command, GroupId, Groups};
use crate::{Error, scene::MeshHandle};

/// Kind of a command argument
#[derive(Copy, Clone, Debug, Eq, PartialEq, strum::Display)]
pub enum ArgKind {
    /// Free-form text (e.g. a file path)
    String,
    /// Signed integer
    Integer,
    /// Floating-point value
    Float,
    /// Boolean flag
    Bool,
    /// Weak handle to a mesh content in the scene
    MeshContent,
}

/// A single argument value passed to [`CommandFactory::create`]
#[derive(Clone)]
pub enum ArgValue {
    /// See [`ArgKind::String`]
    String(String),
    /// See [`ArgKind::Integer`]
    Integer(i64),
    /// See [`ArgKind::Float`]
    Float(f64),
    /// See [`ArgKind::Bool`]
    Bool(bool),
    /// See [`ArgKind::MeshContent`]
    MeshContent(MeshHandle),
}

impl ArgValue {
    /// Returns the kind of this value
    pub fn kind(&self) -> ArgKind {
        match self {
            ArgValue::String(..) => ArgKind::String,
            ArgValue::Integer(..) => ArgKind::Integer,
            ArgValue::Float(..) => ArgKind::Float,
            ArgValue::Bool(..) => ArgKind::Bool,
            ArgValue::MeshContent(..) => ArgKind::MeshContent,
        }
    }
}

/// A Rust type which can be unpacked from an [`ArgValue`]
pub trait Arg: Sized {
    /// Kind of value expected
    const KIND: ArgKind;
    /// Unpacks the value, returning `None` if it is the wrong kind
    fn from_value(v: ArgValue) -> Option<Self>;
}

macro_rules! impl_arg {
    ($t:ty, $kind:ident) => {
        impl Arg for $t {
            const KIND: ArgKind = ArgKind::$kind;
            fn from_value(v: ArgValue) -> Option<Self> {
                match v {
                    ArgValue::$kind(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

impl_arg!(String, String);
impl_arg!(i64, Integer);
impl_arg!(f64, Float);
impl_arg!(bool, Bool);
impl_arg!(MeshHandle, MeshContent);

/// A tuple of [`Arg`] values, used as a command's argument schema
pub trait ArgTuple: Sized {
    /// Returns the kind of each argument, in order
    fn kinds() -> Vec<ArgKind>;
    /// Unpacks a list of values, checking count and kinds
    fn from_values(values: Vec<ArgValue>) -> Result<Self, Error>;
}

fn unpack<A: Arg>(index: usize, v: Option<ArgValue>) -> Result<A, Error> {
    let v = v.ok_or(Error::BadArgCount {
        expected: index + 1,
        actual: index,
    })?;
    let actual = v.kind();
    A::from_value(v).ok_or(Error::BadArgKind {
        index,
        expected: A::KIND,
        actual,
    })
}

macro_rules! impl_arg_tuple {
    ($($t:ident),*) => {
        impl<$($t: Arg),*> ArgTuple for ($($t,)*) {
            fn kinds() -> Vec<ArgKind> {
                vec![$($t::KIND),*]
            }
            #[allow(unused_mut, unused_variables, unused_assignments)]
            fn from_values(values: Vec<ArgValue>) -> Result<Self, Error> {
                let expected = Self::kinds().len();
                if values.len() != expected {
                    return Err(Error::BadArgCount {
                        expected,
                        actual: values.len(),
                    });
                }
                let mut iter = values.into_iter();
                let mut index = 0;
                Ok(($({
                    let v = unpack::<$t>(index, iter.next())?;
                    index += 1;
                    v
                },)*))
            }
        }
    };
}

impl_arg_tuple!();
impl_arg_tuple!(A);
impl_arg_tuple!(A, B);
impl_arg_tuple!(A, B, C);
impl_arg_tuple!(A, B, C, D);

/// Description of a single command argument
#[derive(Clone, Debug)]
pub struct ArgDesc {
    /// Expected kind
    pub kind: ArgKind,
    /// Short name, shown in the GUI
    pub name: String,
    /// One-line documentation
    pub doc: String,
}

type Constructor =
    Box<dyn Fn(Vec<ArgValue>) -> Result<Box<dyn Command>, Error> + Send + Sync>;

/// A registered command: metadata plus a constructor
pub struct CommandEntry {
    name: String,
    group: GroupId,
    help: String,
    args: Vec<ArgDesc>,
    build: Constructor,
}

impl CommandEntry {
    /// Returns the command's registered name
    pub fn name(&self) -> &str {
        &self.name
    }
    /// Returns the group in which the command is listed
    pub fn group(&self) -> GroupId {
        self.group
    }
    /// Returns the command's help text
    pub fn help(&self) -> &str {
        &self.help
    }
    /// Returns the command's argument schema
    pub fn args(&self) -> &[ArgDesc] {
        &self.args
    }
    /// Constructs the command from a list of argument values
    pub fn build(
        &self,
        args: Vec<ArgValue>,
    ) -> Result<Box<dyn Command>, Error> {
        (self.build)(args)
    }
}

/// Builder returned by [`CommandFactory::add_command`]
///
/// Arguments are described positionally: the first call to
/// [`arg`](CommandBuilder::arg) describes the first argument, and so on.
pub struct CommandBuilder<'a> {
    entry: &'a mut CommandEntry,
    next_arg: usize,
}

impl CommandBuilder<'_> {
    /// Sets the command's help text
    pub fn help(self, text: &str) -> Self {
        self.entry.help = text.to_owned();
        self
    }

    /// Names and documents the next argument
    ///
    /// # Panics
    /// If called more times than there are arguments
    pub fn arg(mut self, name: &str, doc: &str) -> Self {
        let Some(a) = self.entry.args.get_mut(self.next_arg) else {
            panic!(
                "command {:?} has only {} arguments",
                self.entry.name,
                self.entry.args.len()
            );
        };
        a.name = name.to_owned();
        a.doc = doc.to_owned();
        self.next_arg += 1;
        self
    }
}

/// Registry mapping command names to constructors
///
/// The factory owns the [`Groups`] tree, so that registering a command also
/// lists it in its group.
pub struct CommandFactory {
    groups: Groups,
    entries: BTreeMap<String, CommandEntry>,
}

impl Default for CommandFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandFactory {
    /// Builds an empty factory with a fresh group tree
    pub fn new() -> Self {
        Self {
            groups: Groups::new(),
            entries: BTreeMap::new(),
        }
    }

    /// Returns the group tree
    pub fn groups(&self) -> &Groups {
        &self.groups
    }

    /// Registers a command constructor under the given name and group
    ///
    /// The argument schema is taken from the tuple type `A`:
    ///
    /// ```
    /// # use grobview::command::{CommandFactory, GroupId, NoOp};
    /// let mut f = CommandFactory::new();
    /// f.add_command("wait", GroupId::Debug, |(_ticks,): (i64,)| NoOp)
    ///     .help("Does nothing")
    ///     .arg("ticks", "Number of ticks to wait");
    /// assert_eq!(f.get("wait").unwrap().args().len(), 1);
    /// ```
    ///
    /// # Panics
    /// If a command with this name is already registered
    pub fn add_command<A, C, F>(
        &mut self,
        name: &str,
        group: GroupId,
        ctor: F,
    ) -> CommandBuilder<'_>
    where
        A: ArgTuple + 'static,
        C: Command + 'static,
        F: Fn(A) -> C + Send + Sync + 'static,
    {
        assert!(
            !self.entries.contains_key(name),
            "command {name:?} is already registered"
        );
        let args = A::kinds()
            .into_iter()
            .enumerate()
            .map(|(i, kind)| ArgDesc {
                kind,
                name: format!("arg{i}"),
                doc: String::new(),
            })
            .collect();
        self.groups.get_mut(group).add_command(name);
        let entry = self.entries.entry(name.to_owned()).or_insert(CommandEntry {
            name: name.to_owned(),
            group,
            help: String::new(),
            args,
            build: Box::new(move |values| {
                let a = A::from_values(values)?;
                Ok(Box::new(ctor(a)) as Box<dyn Command>)
            }),
        });
        CommandBuilder { entry, next_arg: 0 }
    }

    /// Looks up a command by name
    pub fn get(&self, name: &str) -> Option<&CommandEntry> {
        self.entries.get(name)
    }

    /// Iterates over every registered command, sorted by name
    pub fn iter(&self) -> impl Iterator<Item = &CommandEntry> {
        self.entries.values()
    }

    /// Constructs a command by name from a list of argument values
    pub fn create(
        &self,
        name: &str,
        args: Vec<ArgValue>,
    ) -> Result<Box<dyn Command>, Error> {
        let entry = self
            .get(name)
            .ok_or_else(|| Error::UnknownCommand(name.to_owned()))?;
        entry.build(args)
    }
}
