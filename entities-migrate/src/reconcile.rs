//! Three-way reconciliation of live, recorded and declared schemas.

use std::sync::Arc;

use entities_schema::{DdlGenerator, SchemaRegistry};
use entities_sqlite::{Executor, catalog};
use tracing::{debug, info, warn};

use crate::diff::{
    ALTERED_BY_MODEL, ALTERED_OUTSIDE, CREATED_OUTSIDE, DROPPED_OUTSIDE, Difference,
};
use crate::error::MigrateResult;
use crate::fingerprint::{FingerprintRecords, FingerprintStore};

/// Outcome of a reconciliation run.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// Physical differences followed by object differences.
    pub differences: Vec<Difference>,
    /// Declared tables that exist neither live nor in the store.
    pub missing: Vec<String>,
    /// The records the comparison was made against.
    pub records: FingerprintRecords,
}

impl Reconciliation {
    /// Whether everything agrees.
    pub fn is_in_sync(&self) -> bool {
        self.differences.is_empty()
    }

    /// Physical differences only.
    pub fn physical(&self) -> impl Iterator<Item = &Difference> {
        self.differences.iter().filter(|d| d.is_physical())
    }

    /// Object differences only.
    pub fn object(&self) -> impl Iterator<Item = &Difference> {
        self.differences.iter().filter(|d| d.is_object())
    }
}

/// Compares the live catalog and the declared models against the store.
pub struct Reconciler<'a> {
    executor: Arc<dyn Executor>,
    store: &'a FingerprintStore,
    registry: &'a SchemaRegistry,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler.
    pub fn new(
        executor: Arc<dyn Executor>,
        store: &'a FingerprintStore,
        registry: &'a SchemaRegistry,
    ) -> Self {
        Self {
            executor,
            store,
            registry,
        }
    }

    /// Run both checks. They are independent and run concurrently; both must
    /// finish before the result is returned.
    pub async fn run(&self) -> MigrateResult<Reconciliation> {
        let ((mut differences, live), (object, missing, records)) =
            tokio::try_join!(self.physical_check(), self.object_check())?;

        // Declared tables that show up live but unrecorded are already
        // reported by the physical check.
        let missing = missing
            .into_iter()
            .filter(|name| !live.contains(name))
            .collect::<Vec<_>>();

        differences.extend(object);

        if differences.is_empty() {
            info!(tables = records.len(), "Schema in sync");
        } else {
            for difference in &differences {
                warn!(table = %difference.name, kind = %difference.kind, reason = %difference.reason, "Schema difference");
            }
        }

        Ok(Reconciliation {
            differences,
            missing,
            records,
        })
    }

    /// Compare every live user table against its record.
    ///
    /// Returns the differences and the names of the live tables.
    pub async fn physical_check(&self) -> MigrateResult<(Vec<Difference>, Vec<String>)> {
        let records = self.store.records().await?;
        let live = catalog::user_tables(self.executor.as_ref()).await?;

        let mut differences = Vec::new();
        for table in &live {
            match records.get(&table.name) {
                Some(record) if record.matches(&table.sql) => {
                    debug!(table = %table.name, "Live table matches fingerprint");
                }
                Some(_) => differences.push(Difference::physical(&table.name, ALTERED_OUTSIDE)),
                None => differences.push(Difference::physical(&table.name, CREATED_OUTSIDE)),
            }
        }

        for name in records.keys() {
            if !live.iter().any(|t| &t.name == name) {
                differences.push(Difference::physical(name, DROPPED_OUTSIDE));
            }
        }

        Ok((differences, live.into_iter().map(|t| t.name).collect()))
    }

    /// Compare every declared model against its record.
    ///
    /// Returns the differences, the declared tables without a record, and
    /// the records read.
    pub async fn object_check(
        &self,
    ) -> MigrateResult<(Vec<Difference>, Vec<String>, FingerprintRecords)> {
        let records = self.store.records().await?;

        let mut differences = Vec::new();
        let mut missing = Vec::new();
        for model in self.registry.iter() {
            let sql = DdlGenerator.catalog_create_table(model)?;
            match records.get(model.name()) {
                Some(record) if record.matches(&sql) => {
                    debug!(table = model.name(), "Model matches fingerprint");
                }
                Some(_) => differences.push(Difference::object(model.name(), ALTERED_BY_MODEL)),
                None => missing.push(model.name().to_string()),
            }
        }

        Ok((differences, missing, records))
    }
}
