//! Ingestion service - deduplicating insert-or-update of PIX transactions.
//!
//! Every bank source (mock Open Finance provider, Itaú polling, Itaú
//! webhooks) hands its transactions to [`upsert_transactions`].
//!
//! # Identity
//!
//! Inside an organization a transaction is matched by end-to-end ID first
//! and by transaction ID second. Matching is case-insensitive and blank IDs
//! never match anything.
//!
//! # Atomicity Guarantees
//!
//! All writes of a batch happen in one PostgreSQL transaction.

use std::collections::HashMap;

use uuid::Uuid;

use crate::{db::DbPool, error::AppError, models::pix_transaction::NewPixTransaction};

/// Counts of a completed upsert.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpsertResult {
    pub inserted: usize,
    pub updated: usize,
}

impl UpsertResult {
    pub fn total(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Identity columns of a stored transaction.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredIdentity {
    pub id: Uuid,
    pub tx_id: String,
    pub end_to_end_id: String,
}

/// Write decided for one incoming transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertAction {
    Insert {
        id: Uuid,
        transaction: NewPixTransaction,
    },
    Update {
        id: Uuid,
        transaction: NewPixTransaction,
    },
}

fn identity_key(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_lowercase())
}

#[derive(Default)]
struct IdentityIndex {
    by_end_to_end: HashMap<String, Uuid>,
    by_tx_id: HashMap<String, Uuid>,
}

impl IdentityIndex {
    fn remember(&mut self, id: Uuid, tx_id: &str, end_to_end_id: &str) {
        if let Some(key) = identity_key(end_to_end_id) {
            self.by_end_to_end.insert(key, id);
        }
        if let Some(key) = identity_key(tx_id) {
            self.by_tx_id.insert(key, id);
        }
    }

    fn find(&self, transaction: &NewPixTransaction) -> Option<Uuid> {
        identity_key(&transaction.end_to_end_id)
            .and_then(|key| self.by_end_to_end.get(&key).copied())
            .or_else(|| {
                identity_key(&transaction.tx_id).and_then(|key| self.by_tx_id.get(&key).copied())
            })
    }
}

/// Decide, without touching the database, which incoming transactions are
/// inserted and which update an existing row.
///
/// A transaction repeated inside the batch updates the row its first
/// occurrence produced, so the last occurrence wins.
pub fn plan_upsert(
    existing: &[StoredIdentity],
    incoming: Vec<NewPixTransaction>,
) -> Vec<UpsertAction> {
    let mut index = IdentityIndex::default();
    for row in existing {
        index.remember(row.id, &row.tx_id, &row.end_to_end_id);
    }

    incoming
        .into_iter()
        .map(|transaction| match index.find(&transaction) {
            Some(id) => {
                index.remember(id, &transaction.tx_id, &transaction.end_to_end_id);
                UpsertAction::Update { id, transaction }
            }
            None => {
                let id = Uuid::new_v4();
                index.remember(id, &transaction.tx_id, &transaction.end_to_end_id);
                UpsertAction::Insert { id, transaction }
            }
        })
        .collect()
}

/// Insert new transactions and update already known ones.
///
/// # Process
///
/// 1. Collect the batch's non-blank end-to-end IDs and transaction IDs
/// 2. Load the organization's rows matching any of them
/// 3. Plan inserts and updates with [`plan_upsert`]
/// 4. Apply all writes in one database transaction
///
/// Identifiers and payer fields longer than their columns are cut first,
/// so one oversized entry cannot fail the batch.
///
/// Updates rewrite the transaction's data but never its
/// `notification_status`, so a re-delivered transaction is not alerted twice.
///
/// # Errors
///
/// - `Database`: Database error occurred (nothing is written)
pub async fn upsert_transactions(
    pool: &DbPool,
    organization_id: Uuid,
    incoming: Vec<NewPixTransaction>,
) -> Result<UpsertResult, AppError> {
    if incoming.is_empty() {
        return Ok(UpsertResult::default());
    }
    let incoming: Vec<NewPixTransaction> =
        incoming.into_iter().map(NewPixTransaction::bounded).collect();

    let mut end_to_end_ids: Vec<String> = incoming
        .iter()
        .filter_map(|t| identity_key(&t.end_to_end_id))
        .collect();
    end_to_end_ids.sort();
    end_to_end_ids.dedup();

    let mut tx_ids: Vec<String> = incoming
        .iter()
        .filter_map(|t| identity_key(&t.tx_id))
        .collect();
    tx_ids.sort();
    tx_ids.dedup();

    let mut tx = pool.begin().await?;

    let existing = sqlx::query_as::<_, StoredIdentity>(
        r#"
        SELECT id, tx_id, end_to_end_id
        FROM pix_transactions
        WHERE organization_id = $1
          AND ((end_to_end_id <> '' AND lower(end_to_end_id) = ANY($2))
               OR (tx_id <> '' AND lower(tx_id) = ANY($3)))
        ORDER BY created_at
        "#,
    )
    .bind(organization_id)
    .bind(&end_to_end_ids)
    .bind(&tx_ids)
    .fetch_all(&mut *tx)
    .await?;

    let mut result = UpsertResult::default();

    for action in plan_upsert(&existing, incoming) {
        match action {
            UpsertAction::Insert { id, transaction } => {
                sqlx::query(
                    r#"
                    INSERT INTO pix_transactions (
                        id,
                        organization_id,
                        tx_id,
                        end_to_end_id,
                        amount_cents,
                        occurred_at,
                        payer_name,
                        payer_key,
                        description,
                        raw_json,
                        notification_status
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'pending')
                    "#,
                )
                .bind(id)
                .bind(organization_id)
                .bind(&transaction.tx_id)
                .bind(&transaction.end_to_end_id)
                .bind(transaction.amount_cents)
                .bind(transaction.occurred_at)
                .bind(&transaction.payer_name)
                .bind(&transaction.payer_key)
                .bind(&transaction.description)
                .bind(&transaction.raw_json)
                .execute(&mut *tx)
                .await?;

                result.inserted += 1;
            }
            UpsertAction::Update { id, transaction } => {
                sqlx::query(
                    r#"
                    UPDATE pix_transactions
                    SET tx_id = $3,
                        end_to_end_id = $4,
                        amount_cents = $5,
                        occurred_at = $6,
                        payer_name = $7,
                        payer_key = $8,
                        description = $9,
                        raw_json = $10,
                        updated_at = NOW()
                    WHERE id = $1 AND organization_id = $2
                    "#,
                )
                .bind(id)
                .bind(organization_id)
                .bind(&transaction.tx_id)
                .bind(&transaction.end_to_end_id)
                .bind(transaction.amount_cents)
                .bind(transaction.occurred_at)
                .bind(&transaction.payer_name)
                .bind(&transaction.payer_key)
                .bind(&transaction.description)
                .bind(&transaction.raw_json)
                .execute(&mut *tx)
                .await?;

                result.updated += 1;
            }
        }
    }

    tx.commit().await?;

    tracing::info!(
        organization_id = %organization_id,
        inserted = result.inserted,
        updated = result.updated,
        "PIX transactions upserted"
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn incoming(tx_id: &str, end_to_end_id: &str, amount_cents: i64) -> NewPixTransaction {
        NewPixTransaction {
            organization_id: Uuid::nil(),
            tx_id: tx_id.to_string(),
            end_to_end_id: end_to_end_id.to_string(),
            amount_cents,
            occurred_at: Utc::now(),
            payer_name: "Ana Souza".to_string(),
            payer_key: "ana@pix.com".to_string(),
            description: "PIX recebido".to_string(),
            raw_json: serde_json::json!({}),
        }
    }

    fn stored(tx_id: &str, end_to_end_id: &str) -> StoredIdentity {
        StoredIdentity {
            id: Uuid::new_v4(),
            tx_id: tx_id.to_string(),
            end_to_end_id: end_to_end_id.to_string(),
        }
    }

    fn counts(actions: &[UpsertAction]) -> UpsertResult {
        actions.iter().fold(UpsertResult::default(), |mut acc, a| {
            match a {
                UpsertAction::Insert { .. } => acc.inserted += 1,
                UpsertAction::Update { .. } => acc.updated += 1,
            }
            acc
        })
    }

    fn target(action: &UpsertAction) -> Uuid {
        match action {
            UpsertAction::Insert { id, .. } | UpsertAction::Update { id, .. } => *id,
        }
    }

    #[test]
    fn duplicate_end_to_end_id_updates_instead_of_inserting() {
        let row = stored("TX1", "E2EABC");

        let actions = plan_upsert(&[row.clone()], vec![incoming("TX-other", "e2eabc", 500)]);

        assert_eq!(counts(&actions), UpsertResult { inserted: 0, updated: 1 });
        assert_eq!(target(&actions[0]), row.id);
    }

    #[test]
    fn end_to_end_match_wins_over_tx_id_match() {
        let by_tx_id = stored("TX1", "E2E-FIRST");
        let by_e2e = stored("TX2", "E2E-SECOND");

        let actions = plan_upsert(
            &[by_tx_id.clone(), by_e2e.clone()],
            vec![incoming("tx1", "E2E-SECOND", 100)],
        );

        assert_eq!(target(&actions[0]), by_e2e.id);
    }

    #[test]
    fn tx_id_matches_when_end_to_end_is_unknown() {
        let row = stored("TX1", "E2E-FIRST");

        let actions = plan_upsert(&[row.clone()], vec![incoming("tx1", "E2E-NEW", 100)]);

        assert!(matches!(actions[0], UpsertAction::Update { id, .. } if id == row.id));
    }

    #[test]
    fn blank_ids_never_match() {
        let row = stored("", "");

        let actions = plan_upsert(
            &[row],
            vec![incoming("", "", 100), incoming("  ", "  ", 200)],
        );

        assert_eq!(counts(&actions), UpsertResult { inserted: 2, updated: 0 });
    }

    #[test]
    fn duplicates_inside_a_batch_collapse_onto_first_occurrence() {
        let actions = plan_upsert(
            &[],
            vec![
                incoming("TX1", "E2E1", 100),
                incoming("TX2", "E2E2", 200),
                incoming("TX1", "e2e1", 150),
            ],
        );

        assert_eq!(counts(&actions), UpsertResult { inserted: 2, updated: 1 });
        assert_eq!(target(&actions[2]), target(&actions[0]));
        match &actions[2] {
            UpsertAction::Update { transaction, .. } => assert_eq!(transaction.amount_cents, 150),
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn new_transactions_are_inserted() {
        let actions = plan_upsert(
            &[stored("TX1", "E2E1")],
            vec![incoming("TX9", "E2E9", 100)],
        );

        assert_eq!(counts(&actions), UpsertResult { inserted: 1, updated: 0 });
        assert_eq!(counts(&actions).total(), 1);
    }
}
