//! JSON file-backed inventory store.
//!
//! Holds the whole inventory in memory and writes it through to two documents,
//! `products.json` and `gatepasses.json`, rewritten wholesale on every mutation.
//! A mutation runs against a copy of the state; the copy is staged to temp files,
//! both are renamed into place, and only then does it replace the in-memory
//! mirror. A failed write leaves the mirror unchanged.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument};

use gatepass_core::ProductId;
use gatepass_inventory::{GatePass, NewProduct, Product, ReconciliationMode};

use super::{InventoryState, InventoryStore, IntakeOutcome, IssuedGatePass, StoreError, StoreResult};
use crate::seed;

pub const PRODUCTS_FILE: &str = "products.json";
pub const GATE_PASSES_FILE: &str = "gatepasses.json";

/// One of the two persisted documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Document {
    Products,
    GatePasses,
}

impl Document {
    fn file_name(self) -> &'static str {
        match self {
            Document::Products => PRODUCTS_FILE,
            Document::GatePasses => GATE_PASSES_FILE,
        }
    }
}

const PRODUCTS_ONLY: &[Document] = &[Document::Products];

const BOTH: &[Document] = &[Document::Products, Document::GatePasses];

#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    state: Mutex<InventoryState>,
}

impl JsonFileStore {
    /// Open (or initialise) the store under `dir`.
    ///
    /// Creates the directory if needed. A missing products document is created,
    /// holding the default products when `seed_defaults` is set. A missing gate
    /// pass document loads as empty. Unparseable documents are an error.
    pub async fn open(dir: impl Into<PathBuf>, seed_defaults: bool) -> StoreResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;

        let products_path = dir.join(PRODUCTS_FILE);
        let products: Vec<Product> = match read_json(&products_path).await? {
            Some(products) => products,
            None => {
                let products = if seed_defaults {
                    seed::default_products(Utc::now())
                } else {
                    Vec::new()
                };
                write_json(&products_path, &products).await?;
                info!(count = products.len(), "initialised products document");
                products
            }
        };

        let gate_passes: Vec<GatePass> = read_json(&dir.join(GATE_PASSES_FILE))
            .await?
            .unwrap_or_default();

        info!(
            products = products.len(),
            gate_passes = gate_passes.len(),
            dir = %dir.display(),
            "loaded inventory data"
        );

        Ok(Self {
            dir,
            state: Mutex::new(InventoryState::new(products, gate_passes)),
        })
    }

    /// Apply `f` to a copy of the state and persist the `touches` documents.
    ///
    /// Documents are staged to temp files and renamed into place one by one. If a
    /// rename fails, documents already renamed are rewritten from the previous
    /// state, so disk and mirror both keep the state from before the call.
    async fn mutate<T>(
        &self,
        touches: &[Document],
        f: impl FnOnce(&mut InventoryState) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut guard = self.state.lock().await;
        let mut next = guard.clone();
        let out = f(&mut next)?;

        let mut staged = Vec::with_capacity(touches.len());
        for &doc in touches {
            match self.stage(doc, &next).await {
                Ok(paths) => staged.push((doc, paths)),
                Err(e) => {
                    discard_staged(staged.iter().map(|(_, (tmp, _))| tmp)).await;
                    return Err(e);
                }
            }
        }

        let mut renamed = Vec::with_capacity(staged.len());
        for (idx, (doc, (tmp, target))) in staged.iter().enumerate() {
            if let Err(e) = tokio::fs::rename(tmp, target).await {
                discard_staged(staged[idx..].iter().map(|(_, (tmp, _))| tmp)).await;
                self.restore(&guard, &renamed).await;
                return Err(e.into());
            }
            renamed.push(*doc);
        }
        debug!(
            products = next.products().len(),
            gate_passes = next.gate_passes().len(),
            "inventory documents written"
        );

        *guard = next;
        Ok(out)
    }

    async fn stage(&self, doc: Document, state: &InventoryState) -> StoreResult<(PathBuf, PathBuf)> {
        let target = self.dir.join(doc.file_name());
        match doc {
            Document::Products => stage_json(&target, state.products()).await,
            Document::GatePasses => stage_json(&target, state.gate_passes()).await,
        }
    }

    /// Rewrite `docs` from `previous` after a partially applied commit.
    async fn restore(&self, previous: &InventoryState, docs: &[Document]) {
        for &doc in docs {
            let restored = match self.stage(doc, previous).await {
                Ok((tmp, target)) => tokio::fs::rename(&tmp, &target).await.map_err(StoreError::from),
                Err(e) => Err(e),
            };
            if let Err(e) = restored {
                error!(document = doc.file_name(), error = %e, "failed to restore document after aborted write");
            }
        }
    }
}

async fn discard_staged<'a>(paths: impl Iterator<Item = &'a PathBuf>) {
    for path in paths {
        let _ = tokio::fs::remove_file(path).await;
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> StoreResult<Option<T>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write `value` next to `target` and return `(temp_path, target)` for the rename.
async fn stage_json<T: Serialize + ?Sized>(target: &Path, value: &T) -> StoreResult<(PathBuf, PathBuf)> {
    let mut tmp = target.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, serde_json::to_vec_pretty(value)?).await?;
    Ok((tmp, target.to_path_buf()))
}

async fn write_json<T: Serialize + ?Sized>(target: &Path, value: &T) -> StoreResult<()> {
    let (tmp, target) = stage_json(target, value).await?;
    tokio::fs::rename(&tmp, &target).await?;
    Ok(())
}

#[async_trait]
impl InventoryStore for JsonFileStore {
    fn backend(&self) -> &'static str {
        "JSON Files"
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        Ok(self.state.lock().await.products_newest_first())
    }

    async fn get_product(&self, product_id: &ProductId) -> StoreResult<Option<Product>> {
        Ok(self.state.lock().await.product(product_id).cloned())
    }

    #[instrument(skip(self, intake), fields(name = %intake.name), err)]
    async fn receive_stock(
        &self,
        intake: NewProduct,
        candidate_id: ProductId,
        now: DateTime<Utc>,
    ) -> StoreResult<IntakeOutcome> {
        self.mutate(PRODUCTS_ONLY, |s| s.receive_stock(intake, candidate_id, now))
            .await
    }

    #[instrument(skip(self), err)]
    async fn set_quantity(
        &self,
        product_id: &ProductId,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<Product> {
        self.mutate(PRODUCTS_ONLY, |s| s.set_quantity(product_id, quantity, now))
            .await
    }

    #[instrument(skip(self), err)]
    async fn delete_product(&self, product_id: &ProductId) -> StoreResult<()> {
        self.mutate(PRODUCTS_ONLY, |s| s.delete_product(product_id)).await
    }

    async fn list_gate_passes(&self) -> StoreResult<Vec<GatePass>> {
        Ok(self.state.lock().await.gate_passes_newest_first())
    }

    #[instrument(skip(self, gate_pass), fields(number = %gate_pass.gate_pass_number()), err)]
    async fn issue_gate_pass(
        &self,
        gate_pass: GatePass,
        mode: ReconciliationMode,
    ) -> StoreResult<IssuedGatePass> {
        self.mutate(BOTH, |s| {
            let plan = s.issue_gate_pass(gate_pass.clone(), mode)?;
            Ok(IssuedGatePass { gate_pass, plan })
        })
        .await
    }
}
