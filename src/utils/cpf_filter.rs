use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use once_cell::sync::Lazy;
use sqlx::PgPool;
use std::sync::RwLock;

/// Expected capacity and false-positive rate.
/// Tune these based on real headcount.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static CPF_FILTER: Lazy<RwLock<CuckooFilter<String>>> = Lazy::new(|| {
    RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE))
});

/// Check if a CPF might already have an account (false positives possible)
pub fn might_exist(cpf: &str) -> bool {
    CPF_FILTER
        .read()
        .expect("cpf filter poisoned")
        .contains(&cpf.to_string())
}

/// Insert a single CPF into the filter
pub fn insert(cpf: &str) {
    CPF_FILTER
        .write()
        .expect("cpf filter poisoned")
        .add(&cpf.to_string());
}

/// Remove a CPF from the filter (account deleted)
pub fn remove(cpf: &str) {
    CPF_FILTER
        .write()
        .expect("cpf filter poisoned")
        .remove(&cpf.to_string());
}

/// Warm up the CPF filter using streaming + batching
pub async fn warmup_cpf_filter(pool: &PgPool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>("SELECT cpf FROM employes").fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (cpf,) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;

        batch.push(cpf);
        total += 1;

        if batch.len() == batch_size {
            insert_batch(&batch);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch);
    }

    log::info!("CPF filter warmup complete: {} accounts", total);
    Ok(())
}

/// Insert a batch of CPFs
fn insert_batch(cpfs: &[String]) {
    let mut filter = CPF_FILTER.write().expect("cpf filter poisoned");

    for cpf in cpfs {
        filter.add(cpf);
    }
}
