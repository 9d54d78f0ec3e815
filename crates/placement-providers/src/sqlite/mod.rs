//! SQLite-backed [`ProviderGraphStore`] implementation, gated behind the
//! `sqlite` feature.
//!
//! Writes go straight to SQL with the `generation` column enforcing
//! optimistic concurrency (an `UPDATE ... WHERE generation = ? RETURNING
//! generation` per write, exactly as [`placement-domain`'s port contract
//! requires). Reads reconstruct an in-memory snapshot of the graph and
//! reuse the same pure matching helpers the in-memory store uses — the
//! candidate sets a deployment sees must not depend on which backend is
//! behind the port, so duplicating the matching logic per backend would
//! be a correctness risk this crate isn't willing to take.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use uuid::Uuid;

use placement_domain::entities::{
    Allocation, AggregateId, InventoryRecord, ProviderId, ResourceClass, ResourceClassId,
    ResourceProvider, Trait, TraitId, CUSTOM_RESOURCE_CLASS_PREFIX, CUSTOM_TRAIT_PREFIX,
};
use placement_domain::error::{Error, Result};
use placement_domain::ports::{
    ProviderGraphStore, ProviderTreeNode, RequestContext, ResourceClassStore, TraitStore,
};

const SCHEMA_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS providers (
        id INTEGER PRIMARY KEY,
        uuid TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL UNIQUE,
        parent_id INTEGER,
        root_id INTEGER,
        generation INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS inventories (
        provider_id INTEGER NOT NULL,
        class_kind TEXT NOT NULL,
        class_value INTEGER NOT NULL,
        total INTEGER NOT NULL,
        reserved INTEGER NOT NULL,
        min_unit INTEGER NOT NULL,
        max_unit INTEGER NOT NULL,
        step_size INTEGER NOT NULL,
        allocation_ratio REAL NOT NULL,
        PRIMARY KEY (provider_id, class_kind, class_value)
    )",
    "CREATE TABLE IF NOT EXISTS allocations (
        consumer_id TEXT NOT NULL,
        provider_id INTEGER NOT NULL,
        class_kind TEXT NOT NULL,
        class_value INTEGER NOT NULL,
        used INTEGER NOT NULL,
        PRIMARY KEY (consumer_id, provider_id, class_kind, class_value)
    )",
    "CREATE TABLE IF NOT EXISTS provider_traits (
        provider_id INTEGER NOT NULL,
        trait_kind TEXT NOT NULL,
        trait_value INTEGER NOT NULL,
        PRIMARY KEY (provider_id, trait_kind, trait_value)
    )",
    "CREATE TABLE IF NOT EXISTS provider_aggregates (
        provider_id INTEGER NOT NULL,
        aggregate_id INTEGER NOT NULL,
        PRIMARY KEY (provider_id, aggregate_id)
    )",
    "CREATE TABLE IF NOT EXISTS custom_resource_classes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    )",
    "CREATE TABLE IF NOT EXISTS custom_traits (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    )",
];

fn encode_class(id: ResourceClassId) -> (&'static str, i64) {
    match id {
        ResourceClassId::Standard(n) => ("standard", i64::from(n)),
        ResourceClassId::Custom(n) => ("custom", n),
    }
}

fn decode_class(kind: &str, value: i64) -> ResourceClassId {
    match kind {
        "standard" => ResourceClassId::Standard(value as u16),
        _ => ResourceClassId::Custom(value),
    }
}

fn encode_trait(id: TraitId) -> (&'static str, i64) {
    match id {
        TraitId::Standard(n) => ("standard", i64::from(n)),
        TraitId::Custom(n) => ("custom", n),
    }
}

fn decode_trait(kind: &str, value: i64) -> TraitId {
    match kind {
        "standard" => TraitId::Standard(value as u16),
        _ => TraitId::Custom(value),
    }
}

fn sharing_trait_id() -> TraitId {
    TraitId::Standard(
        placement_domain::entities::STANDARD_TRAITS
            .iter()
            .position(|name| *name == placement_domain::entities::MISC_SHARES_VIA_AGGREGATE)
            .expect("MISC_SHARES_VIA_AGGREGATE is a standard trait") as u16,
    )
}

fn storage_err(context: &str, source: sqlx::Error) -> Error {
    Error::storage(context.to_owned(), source)
}

/// A point-in-time read of the whole provider graph, built from four
/// queries and then matched in memory with the same pure helpers
/// [`crate::memory::MemoryGraphStore`] uses.
struct Snapshot {
    providers: HashMap<ProviderId, ResourceProvider>,
    inventories: HashMap<(ProviderId, ResourceClassId), InventoryRecord>,
    used: HashMap<(ProviderId, ResourceClassId), u32>,
    traits: HashMap<ProviderId, HashSet<TraitId>>,
    aggregates: HashMap<ProviderId, HashSet<AggregateId>>,
}

impl Snapshot {
    fn traits_of(&self, id: ProviderId) -> HashSet<TraitId> {
        self.traits.get(&id).cloned().unwrap_or_default()
    }

    fn aggregates_of(&self, id: ProviderId) -> HashSet<AggregateId> {
        self.aggregates.get(&id).cloned().unwrap_or_default()
    }

    fn used_of(&self, id: ProviderId, class: ResourceClassId) -> u32 {
        self.used.get(&(id, class)).copied().unwrap_or(0)
    }

    fn root_of(&self, id: ProviderId) -> ProviderId {
        self.providers
            .get(&id)
            .map(ResourceProvider::root_id_or_self)
            .unwrap_or(id)
    }

    fn member_of_satisfied(&self, id: ProviderId, member_of: &[HashSet<AggregateId>]) -> bool {
        let aggregates = self.aggregates_of(id);
        member_of.iter().all(|inner| !inner.is_disjoint(&aggregates))
    }

    fn satisfies_class(&self, id: ProviderId, class: ResourceClassId, amount: u32) -> bool {
        if let Some(inv) = self.inventories.get(&(id, class)) {
            if placement_domain::inventory::is_satisfiable(inv, self.used_of(id, class), amount) {
                return true;
            }
        }
        let provider_aggregates = self.aggregates_of(id);
        if provider_aggregates.is_empty() {
            return false;
        }
        let sharing = sharing_trait_id();
        self.providers.values().any(|candidate| {
            self.traits_of(candidate.id).contains(&sharing)
                && !self.aggregates_of(candidate.id).is_disjoint(&provider_aggregates)
                && self
                    .inventories
                    .get(&(candidate.id, class))
                    .is_some_and(|inv| {
                        placement_domain::inventory::is_satisfiable(
                            inv,
                            self.used_of(candidate.id, class),
                            amount,
                        )
                    })
        })
    }

    fn node_for(&self, provider: &ResourceProvider) -> ProviderTreeNode {
        let inventories: Vec<InventoryRecord> = self
            .inventories
            .values()
            .filter(|inv| inv.provider_id == provider.id)
            .copied()
            .collect();
        let used = inventories
            .iter()
            .map(|inv| (inv.resource_class_id, self.used_of(provider.id, inv.resource_class_id)))
            .collect();
        ProviderTreeNode {
            provider: provider.clone(),
            inventories,
            used,
            trait_ids: self.traits_of(provider.id),
            aggregate_ids: self.aggregates_of(provider.id),
        }
    }
}

/// A SQLite-backed provider graph store.
pub struct SqliteGraphStore {
    pool: SqlitePool,
}

impl SqliteGraphStore {
    /// Open (and, if missing, create) a SQLite database at `database_url`
    /// and ensure the schema exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the connection or any migration
    /// statement fails.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(database_url)
            .await
            .map_err(|e| storage_err("failed to open sqlite database", e))?;
        for statement in SCHEMA_STATEMENTS {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| storage_err("failed to apply sqlite schema", e))?;
        }
        Ok(Self { pool })
    }

    /// Build around an already-configured pool (e.g. an in-memory
    /// `sqlite::memory:` pool shared across test connections).
    #[must_use]
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn snapshot(&self) -> Result<Snapshot> {
        let provider_rows = sqlx::query(
            "SELECT id, uuid, name, parent_id, root_id, generation FROM providers",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_err("failed to load providers", e))?;

        let mut providers = HashMap::new();
        for row in provider_rows {
            let id = ProviderId(row.get::<i64, _>("id"));
            let uuid: String = row.get("uuid");
            let uuid = Uuid::parse_str(&uuid)
                .map_err(|e| Error::internal(format!("invalid stored uuid: {e}")))?;
            providers.insert(
                id,
                ResourceProvider {
                    id,
                    uuid,
                    name: row.get("name"),
                    parent_id: row.get::<Option<i64>, _>("parent_id").map(ProviderId),
                    root_id: row.get::<Option<i64>, _>("root_id").map(ProviderId),
                    generation: row.get::<i64, _>("generation") as u32,
                },
            );
        }

        let mut inventories = HashMap::new();
        let inventory_rows = sqlx::query(
            "SELECT provider_id, class_kind, class_value, total, reserved, min_unit, max_unit, step_size, allocation_ratio FROM inventories",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_err("failed to load inventories", e))?;
        for row in inventory_rows {
            let provider_id = ProviderId(row.get::<i64, _>("provider_id"));
            let class = decode_class(row.get::<&str, _>("class_kind"), row.get("class_value"));
            inventories.insert(
                (provider_id, class),
                InventoryRecord {
                    provider_id,
                    resource_class_id: class,
                    total: row.get::<i64, _>("total") as u32,
                    reserved: row.get::<i64, _>("reserved") as u32,
                    min_unit: row.get::<i64, _>("min_unit") as u32,
                    max_unit: row.get::<i64, _>("max_unit") as u32,
                    step_size: row.get::<i64, _>("step_size") as u32,
                    allocation_ratio: row.get("allocation_ratio"),
                },
            );
        }

        let mut used: HashMap<(ProviderId, ResourceClassId), u32> = HashMap::new();
        let allocation_rows = sqlx::query(
            "SELECT provider_id, class_kind, class_value, SUM(used) AS used FROM allocations GROUP BY provider_id, class_kind, class_value",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_err("failed to load allocations", e))?;
        for row in allocation_rows {
            let provider_id = ProviderId(row.get::<i64, _>("provider_id"));
            let class = decode_class(row.get::<&str, _>("class_kind"), row.get("class_value"));
            used.insert((provider_id, class), row.get::<i64, _>("used") as u32);
        }

        let mut traits: HashMap<ProviderId, HashSet<TraitId>> = HashMap::new();
        let trait_rows = sqlx::query("SELECT provider_id, trait_kind, trait_value FROM provider_traits")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_err("failed to load provider traits", e))?;
        for row in trait_rows {
            let provider_id = ProviderId(row.get::<i64, _>("provider_id"));
            let trait_id = decode_trait(row.get::<&str, _>("trait_kind"), row.get("trait_value"));
            traits.entry(provider_id).or_default().insert(trait_id);
        }

        let mut aggregates: HashMap<ProviderId, HashSet<AggregateId>> = HashMap::new();
        let aggregate_rows = sqlx::query("SELECT provider_id, aggregate_id FROM provider_aggregates")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_err("failed to load provider aggregates", e))?;
        for row in aggregate_rows {
            let provider_id = ProviderId(row.get::<i64, _>("provider_id"));
            let aggregate_id = AggregateId(row.get::<i64, _>("aggregate_id"));
            aggregates.entry(provider_id).or_default().insert(aggregate_id);
        }

        Ok(Snapshot {
            providers,
            inventories,
            used,
            traits,
            aggregates,
        })
    }
}

/// Bump `provider_id`'s generation inside an already-open transaction,
/// failing with [`Error::ConcurrentUpdateDetected`] if `observed_generation`
/// no longer matches. Callers that also mutate provider-owned rows (an
/// inventory, a trait set, an allocation) must call this *before* making
/// that change and within the same transaction, so a stale generation
/// aborts the whole write rather than taking effect and merely reporting
/// an error (spec §5: a generation mismatch must reject the update, not
/// apply it and complain afterward).
async fn bump_generation_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    provider_id: ProviderId,
    observed_generation: u32,
) -> Result<u32> {
    let row = sqlx::query(
        "UPDATE providers SET generation = generation + 1 WHERE id = ? AND generation = ? RETURNING generation",
    )
    .bind(provider_id.0)
    .bind(i64::from(observed_generation))
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| storage_err("failed to bump provider generation", e))?;

    match row {
        Some(row) => Ok(row.get::<i64, _>("generation") as u32),
        None => {
            let exists = sqlx::query("SELECT 1 FROM providers WHERE id = ?")
                .bind(provider_id.0)
                .fetch_optional(&mut **tx)
                .await
                .map_err(|e| storage_err("failed to check provider existence", e))?;
            if exists.is_none() {
                Err(Error::internal(format!("unknown provider {provider_id:?}")))
            } else {
                Err(Error::ConcurrentUpdateDetected {
                    provider_id: provider_id.0,
                })
            }
        }
    }
}

#[async_trait]
impl ProviderGraphStore for SqliteGraphStore {
    async fn list_providers_matching(
        &self,
        ctx: &RequestContext,
        resources: &[(ResourceClassId, u32)],
        required_trait_ids: &[TraitId],
        forbidden_trait_ids: &[TraitId],
        member_of: &[HashSet<AggregateId>],
    ) -> Result<Vec<(ProviderId, ProviderId)>> {
        if ctx.is_expired() {
            return Err(Error::DeadlineExceeded);
        }
        let snapshot = self.snapshot().await?;
        let sharing = sharing_trait_id();
        let mut out = Vec::new();
        for provider in snapshot.providers.values() {
            let traits = snapshot.traits_of(provider.id);
            if traits.contains(&sharing) {
                continue;
            }
            if !required_trait_ids.iter().all(|t| traits.contains(t)) {
                continue;
            }
            if forbidden_trait_ids.iter().any(|t| traits.contains(t)) {
                continue;
            }
            if !snapshot.member_of_satisfied(provider.id, member_of) {
                continue;
            }
            let satisfied = resources
                .iter()
                .all(|(class, amount)| snapshot.satisfies_class(provider.id, *class, *amount));
            if satisfied {
                out.push((provider.id, snapshot.root_of(provider.id)));
            }
        }
        out.sort_by_key(|(provider_id, _)| *provider_id);
        Ok(out)
    }

    async fn list_providers_with_any_trait(
        &self,
        ctx: &RequestContext,
        trait_ids: &[TraitId],
    ) -> Result<Vec<ProviderId>> {
        if ctx.is_expired() {
            return Err(Error::DeadlineExceeded);
        }
        let snapshot = self.snapshot().await?;
        let mut out: Vec<ProviderId> = snapshot
            .providers
            .values()
            .filter(|p| {
                let traits = snapshot.traits_of(p.id);
                trait_ids.iter().any(|t| traits.contains(t))
            })
            .map(|p| p.id)
            .collect();
        out.sort();
        Ok(out)
    }

    async fn list_providers_having_all_traits(
        &self,
        ctx: &RequestContext,
        trait_ids: &[TraitId],
    ) -> Result<Vec<ProviderId>> {
        if ctx.is_expired() {
            return Err(Error::DeadlineExceeded);
        }
        if trait_ids.is_empty() {
            return Err(Error::bad_request(
                "list_providers_having_all_traits requires at least one trait id",
            ));
        }
        let snapshot = self.snapshot().await?;
        let mut out: Vec<ProviderId> = snapshot
            .providers
            .values()
            .filter(|p| {
                let traits = snapshot.traits_of(p.id);
                trait_ids.iter().all(|t| traits.contains(t))
            })
            .map(|p| p.id)
            .collect();
        out.sort();
        Ok(out)
    }

    async fn get_tree_providers(
        &self,
        ctx: &RequestContext,
        root_ids: &[ProviderId],
    ) -> Result<Vec<ProviderTreeNode>> {
        if ctx.is_expired() {
            return Err(Error::DeadlineExceeded);
        }
        let snapshot = self.snapshot().await?;
        let roots: HashSet<ProviderId> = root_ids.iter().copied().collect();
        let mut out: Vec<ProviderTreeNode> = snapshot
            .providers
            .values()
            .filter(|p| roots.contains(&p.root_id_or_self()) || roots.contains(&p.id))
            .map(|p| snapshot.node_for(p))
            .collect();
        out.sort_by_key(|node| node.provider.id);
        Ok(out)
    }

    async fn get_sharing_providers(
        &self,
        ctx: &RequestContext,
        resource_class_id: ResourceClassId,
    ) -> Result<Vec<(ProviderId, AggregateId)>> {
        if ctx.is_expired() {
            return Err(Error::DeadlineExceeded);
        }
        let snapshot = self.snapshot().await?;
        let sharing = sharing_trait_id();
        let mut out = Vec::new();
        for provider in snapshot.providers.values() {
            if !snapshot.traits_of(provider.id).contains(&sharing) {
                continue;
            }
            if !snapshot.inventories.contains_key(&(provider.id, resource_class_id)) {
                continue;
            }
            for aggregate_id in snapshot.aggregates_of(provider.id) {
                out.push((provider.id, aggregate_id));
            }
        }
        out.sort();
        Ok(out)
    }

    async fn trees_with_traits(
        &self,
        ctx: &RequestContext,
        candidate_provider_ids: &[ProviderId],
        required: &[TraitId],
        forbidden: &[TraitId],
    ) -> Result<Vec<(ProviderId, ProviderId)>> {
        if ctx.is_expired() {
            return Err(Error::DeadlineExceeded);
        }
        let snapshot = self.snapshot().await?;
        let mut out = Vec::new();
        for &provider_id in candidate_provider_ids {
            let root_id = snapshot.root_of(provider_id);
            let tree_traits: HashSet<TraitId> = snapshot
                .providers
                .values()
                .filter(|p| p.root_id_or_self() == root_id)
                .flat_map(|p| snapshot.traits_of(p.id))
                .collect();
            if required.iter().all(|t| tree_traits.contains(t))
                && !forbidden.iter().any(|t| tree_traits.contains(t))
            {
                out.push((provider_id, root_id));
            }
        }
        out.sort_by_key(|(provider_id, _)| *provider_id);
        Ok(out)
    }

    async fn create_provider(
        &self,
        _ctx: &RequestContext,
        name: &str,
        parent_id: Option<ProviderId>,
    ) -> Result<ResourceProvider> {
        let uuid = Uuid::new_v4();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage_err("failed to start transaction", e))?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO providers (uuid, name, parent_id, root_id, generation) VALUES (?, ?, ?, NULL, 0) RETURNING id",
        )
        .bind(uuid.to_string())
        .bind(name)
        .bind(parent_id.map(|p| p.0))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| storage_err("failed to insert provider", e))?;

        let root_id = match parent_id {
            Some(parent) => {
                let row = sqlx::query("SELECT root_id, id FROM providers WHERE id = ?")
                    .bind(parent.0)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| storage_err("failed to read parent provider", e))?;
                row.get::<Option<i64>, _>("root_id")
                    .unwrap_or_else(|| row.get::<i64, _>("id"))
            }
            None => id,
        };
        sqlx::query("UPDATE providers SET root_id = ? WHERE id = ?")
            .bind(root_id)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| storage_err("failed to set provider root_id", e))?;

        tx.commit()
            .await
            .map_err(|e| storage_err("failed to commit provider creation", e))?;

        Ok(ResourceProvider {
            id: ProviderId(id),
            uuid,
            name: name.to_owned(),
            parent_id,
            root_id: Some(ProviderId(root_id)),
            generation: 0,
        })
    }

    async fn update_provider(
        &self,
        _ctx: &RequestContext,
        provider: &ResourceProvider,
        observed_generation: u32,
    ) -> Result<ResourceProvider> {
        let row = sqlx::query(
            "UPDATE providers SET name = ?, parent_id = ?, generation = generation + 1 WHERE id = ? AND generation = ? RETURNING generation",
        )
        .bind(&provider.name)
        .bind(provider.parent_id.map(|p| p.0))
        .bind(provider.id.0)
        .bind(i64::from(observed_generation))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_err("failed to update provider", e))?;

        let generation = match row {
            Some(row) => row.get::<i64, _>("generation") as u32,
            None => {
                return Err(Error::ConcurrentUpdateDetected {
                    provider_id: provider.id.0,
                });
            }
        };
        Ok(ResourceProvider {
            generation,
            ..provider.clone()
        })
    }

    async fn destroy_provider(
        &self,
        _ctx: &RequestContext,
        provider_id: ProviderId,
        observed_generation: u32,
    ) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage_err("failed to start transaction", e))?;
        let row = sqlx::query("SELECT generation FROM providers WHERE id = ?")
            .bind(provider_id.0)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| storage_err("failed to read provider", e))?;
        match row {
            None => return Err(Error::internal(format!("unknown provider {provider_id:?}"))),
            Some(row) => {
                let generation = row.get::<i64, _>("generation") as u32;
                if generation != observed_generation {
                    return Err(Error::ConcurrentUpdateDetected {
                        provider_id: provider_id.0,
                    });
                }
            }
        }
        for statement in [
            "DELETE FROM inventories WHERE provider_id = ?",
            "DELETE FROM allocations WHERE provider_id = ?",
            "DELETE FROM provider_traits WHERE provider_id = ?",
            "DELETE FROM provider_aggregates WHERE provider_id = ?",
            "DELETE FROM providers WHERE id = ?",
        ] {
            sqlx::query(statement)
                .bind(provider_id.0)
                .execute(&mut *tx)
                .await
                .map_err(|e| storage_err("failed to destroy provider", e))?;
        }
        tx.commit()
            .await
            .map_err(|e| storage_err("failed to commit provider destruction", e))?;
        Ok(())
    }

    async fn set_aggregates(
        &self,
        _ctx: &RequestContext,
        provider_id: ProviderId,
        aggregate_ids: HashSet<AggregateId>,
        observed_generation: u32,
    ) -> Result<u32> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage_err("failed to start transaction", e))?;
        let generation = bump_generation_tx(&mut tx, provider_id, observed_generation).await?;
        sqlx::query("DELETE FROM provider_aggregates WHERE provider_id = ?")
            .bind(provider_id.0)
            .execute(&mut *tx)
            .await
            .map_err(|e| storage_err("failed to clear provider aggregates", e))?;
        for aggregate_id in aggregate_ids {
            sqlx::query("INSERT INTO provider_aggregates (provider_id, aggregate_id) VALUES (?, ?)")
                .bind(provider_id.0)
                .bind(aggregate_id.0)
                .execute(&mut *tx)
                .await
                .map_err(|e| storage_err("failed to insert provider aggregate", e))?;
        }
        tx.commit()
            .await
            .map_err(|e| storage_err("failed to commit aggregate update", e))?;
        Ok(generation)
    }

    async fn set_traits(
        &self,
        _ctx: &RequestContext,
        provider_id: ProviderId,
        trait_ids: HashSet<TraitId>,
        observed_generation: u32,
    ) -> Result<u32> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage_err("failed to start transaction", e))?;
        let generation = bump_generation_tx(&mut tx, provider_id, observed_generation).await?;
        sqlx::query("DELETE FROM provider_traits WHERE provider_id = ?")
            .bind(provider_id.0)
            .execute(&mut *tx)
            .await
            .map_err(|e| storage_err("failed to clear provider traits", e))?;
        for trait_id in trait_ids {
            let (kind, value) = encode_trait(trait_id);
            sqlx::query(
                "INSERT INTO provider_traits (provider_id, trait_kind, trait_value) VALUES (?, ?, ?)",
            )
            .bind(provider_id.0)
            .bind(kind)
            .bind(value)
            .execute(&mut *tx)
            .await
            .map_err(|e| storage_err("failed to insert provider trait", e))?;
        }
        tx.commit()
            .await
            .map_err(|e| storage_err("failed to commit trait update", e))?;
        Ok(generation)
    }

    async fn add_inventory(
        &self,
        _ctx: &RequestContext,
        record: InventoryRecord,
        observed_generation: u32,
    ) -> Result<u32> {
        record.validate()?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage_err("failed to start transaction", e))?;
        let generation = bump_generation_tx(&mut tx, record.provider_id, observed_generation).await?;
        let (kind, value) = encode_class(record.resource_class_id);
        sqlx::query(
            "INSERT INTO inventories (provider_id, class_kind, class_value, total, reserved, min_unit, max_unit, step_size, allocation_ratio)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (provider_id, class_kind, class_value) DO UPDATE SET
                total = excluded.total, reserved = excluded.reserved, min_unit = excluded.min_unit,
                max_unit = excluded.max_unit, step_size = excluded.step_size, allocation_ratio = excluded.allocation_ratio",
        )
        .bind(record.provider_id.0)
        .bind(kind)
        .bind(value)
        .bind(i64::from(record.total))
        .bind(i64::from(record.reserved))
        .bind(i64::from(record.min_unit))
        .bind(i64::from(record.max_unit))
        .bind(i64::from(record.step_size))
        .bind(record.allocation_ratio)
        .execute(&mut *tx)
        .await
        .map_err(|e| storage_err("failed to upsert inventory", e))?;
        tx.commit()
            .await
            .map_err(|e| storage_err("failed to commit inventory upsert", e))?;
        Ok(generation)
    }

    async fn record_allocation(
        &self,
        _ctx: &RequestContext,
        allocation: Allocation,
        observed_generation: u32,
    ) -> Result<u32> {
        if allocation.used == 0 {
            return Err(Error::bad_request("allocation amount must be at least 1"));
        }
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage_err("failed to start transaction", e))?;
        let generation =
            bump_generation_tx(&mut tx, allocation.provider_id, observed_generation).await?;
        let (kind, value) = encode_class(allocation.resource_class_id);
        sqlx::query(
            "INSERT INTO allocations (consumer_id, provider_id, class_kind, class_value, used)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (consumer_id, provider_id, class_kind, class_value) DO UPDATE SET used = excluded.used",
        )
        .bind(allocation.consumer_id.to_string())
        .bind(allocation.provider_id.0)
        .bind(kind)
        .bind(value)
        .bind(i64::from(allocation.used))
        .execute(&mut *tx)
        .await
        .map_err(|e| storage_err("failed to upsert allocation", e))?;
        tx.commit()
            .await
            .map_err(|e| storage_err("failed to commit allocation upsert", e))?;
        Ok(generation)
    }
}

#[async_trait]
impl ResourceClassStore for SqliteGraphStore {
    async fn list_custom_resource_classes(&self) -> Result<Vec<ResourceClass>> {
        let rows = sqlx::query("SELECT id, name FROM custom_resource_classes")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_err("failed to load custom resource classes", e))?;
        Ok(rows
            .into_iter()
            .map(|row| ResourceClass {
                id: ResourceClassId::Custom(row.get::<i64, _>("id")),
                name: row.get("name"),
            })
            .collect())
    }

    async fn create_custom_resource_class(&self, name: &str) -> Result<ResourceClass> {
        if !name.starts_with(CUSTOM_RESOURCE_CLASS_PREFIX) {
            return Err(Error::bad_request(format!(
                "custom resource class name must start with {CUSTOM_RESOURCE_CLASS_PREFIX}"
            )));
        }
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO custom_resource_classes (name) VALUES (?) RETURNING id",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::bad_request(format!("resource class name already in use: {name} ({e})")))?;
        Ok(ResourceClass {
            id: ResourceClassId::Custom(id),
            name: name.to_owned(),
        })
    }
}

#[async_trait]
impl TraitStore for SqliteGraphStore {
    async fn list_custom_traits(&self) -> Result<Vec<Trait>> {
        let rows = sqlx::query("SELECT id, name FROM custom_traits")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_err("failed to load custom traits", e))?;
        Ok(rows
            .into_iter()
            .map(|row| Trait {
                id: TraitId::Custom(row.get::<i64, _>("id")),
                name: row.get("name"),
            })
            .collect())
    }

    async fn create_custom_trait(&self, name: &str) -> Result<Trait> {
        if !name.starts_with(CUSTOM_TRAIT_PREFIX) {
            return Err(Error::bad_request(format!(
                "custom trait name must start with {CUSTOM_TRAIT_PREFIX}"
            )));
        }
        let id: i64 =
            sqlx::query_scalar("INSERT INTO custom_traits (name) VALUES (?) RETURNING id")
                .bind(name)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| Error::bad_request(format!("trait name already in use: {name} ({e})")))?;
        Ok(Trait {
            id: TraitId::Custom(id),
            name: name.to_owned(),
        })
    }
}
