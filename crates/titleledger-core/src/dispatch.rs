//! # Operation Dispatch
//!
//! Maps operation names, as received from an external dispatcher, to
//! registry handlers. The name space is closed: anything not listed in
//! [`Operation`] fails with [`LedgerError::UnknownOperation`].

use crate::registry::Registry;
use crate::storage::LedgerStore;
use crate::LedgerError;
use std::fmt;
use std::str::FromStr;

/// Every operation the registry exposes to a dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operation {
    /// `initialize [integer]`: reset legacy value and empty the index.
    Initialize,
    /// `delete [id]`: remove a record and its index entry.
    Delete,
    /// `write [key, value]`: raw overwrite.
    Write,
    /// `init_title [id, vin, make, model, rego, owner]`: create a title.
    InitTitle,
    /// `set_owner [id, new_owner]`: transfer ownership.
    SetOwner,
    /// `update_title [id, vin, make, model, rego]`: overwrite vehicle fields.
    UpdateTitle,
    /// `query [key]`: raw read.
    Query,
}

impl Operation {
    /// All operations, in dispatch table order.
    pub const ALL: [Operation; 7] = [
        Self::Initialize,
        Self::Delete,
        Self::Write,
        Self::InitTitle,
        Self::SetOwner,
        Self::UpdateTitle,
        Self::Query,
    ];

    /// Canonical operation name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Delete => "delete",
            Self::Write => "write",
            Self::InitTitle => "init_title",
            Self::SetOwner => "set_owner",
            Self::UpdateTitle => "update_title",
            Self::Query => "query",
        }
    }

    /// Whether the operation can change ledger state.
    #[must_use]
    pub const fn is_mutating(self) -> bool {
        !matches!(self, Self::Query)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = LedgerError;

    /// Resolve a name, accepting the legacy aliases.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "initialize" | "init" => Ok(Self::Initialize),
            "delete" => Ok(Self::Delete),
            "write" => Ok(Self::Write),
            "init_title" | "init_v5c" => Ok(Self::InitTitle),
            "set_owner" => Ok(Self::SetOwner),
            "update_title" | "update_v5c" => Ok(Self::UpdateTitle),
            "query" => Ok(Self::Query),
            other => Err(LedgerError::UnknownOperation(other.to_string())),
        }
    }
}

impl<S: LedgerStore> Registry<S> {
    /// Run `op` with positional string arguments.
    ///
    /// Returns the stored bytes for [`Operation::Query`] and `None` for every
    /// mutation.
    pub fn invoke(&self, op: Operation, args: &[String]) -> Result<Option<Vec<u8>>, LedgerError> {
        tracing::debug!(operation = %op, argc = args.len(), "dispatching");
        match op {
            Operation::Initialize => self.initialize(args).map(|()| None),
            Operation::Delete => self.delete_title(args).map(|()| None),
            Operation::Write => self.raw_write(args).map(|()| None),
            Operation::InitTitle => self.create_title(args).map(|()| None),
            Operation::SetOwner => self.transfer_owner(args).map(|()| None),
            Operation::UpdateTitle => self.update_title(args).map(|()| None),
            Operation::Query => self.raw_read(args).map(Some),
        }
    }

    /// Resolve `name` and run it.
    pub fn invoke_named(
        &self,
        name: &str,
        args: &[String],
    ) -> Result<Option<Vec<u8>>, LedgerError> {
        let op = name.parse::<Operation>().inspect_err(|_| {
            tracing::warn!(function = name, "run did not find func");
        })?;
        self.invoke(op, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryLedger;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[test]
    fn names_roundtrip_through_parse() {
        for op in Operation::ALL {
            assert_eq!(op.name().parse::<Operation>().expect("parse"), op);
        }
    }

    #[test]
    fn legacy_aliases_resolve() {
        assert_eq!("init".parse::<Operation>().expect("parse"), Operation::Initialize);
        assert_eq!("init_v5c".parse::<Operation>().expect("parse"), Operation::InitTitle);
        assert_eq!(
            "update_v5c".parse::<Operation>().expect("parse"),
            Operation::UpdateTitle
        );
    }

    #[test]
    fn unknown_name_is_rejected() {
        let registry = Registry::new(MemoryLedger::new());
        let result = registry.invoke_named("transfer", &args(&["V1"]));
        assert!(matches!(result, Err(LedgerError::UnknownOperation(ref n)) if n == "transfer"));
        // Names are case-sensitive.
        assert!("Query".parse::<Operation>().is_err());
    }

    #[test]
    fn only_query_returns_payload() {
        let registry = Registry::new(MemoryLedger::new());
        assert_eq!(
            registry
                .invoke(Operation::Initialize, &args(&["1"]))
                .expect("init"),
            None
        );
        assert_eq!(
            registry
                .invoke(Operation::Write, &args(&["k", "v"]))
                .expect("write"),
            None
        );
        assert_eq!(
            registry.invoke(Operation::Query, &args(&["k"])).expect("query"),
            Some(b"v".to_vec())
        );
        assert!(!Operation::Query.is_mutating());
        assert!(Operation::Delete.is_mutating());
    }
}
