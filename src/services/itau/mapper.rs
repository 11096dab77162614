//! Normalization of Itaú statement entries into PIX transactions.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde_json::Value;
use uuid::Uuid;

use crate::{models::pix_transaction::NewPixTransaction, services::itau::models::Lancamento};

const DEFAULT_PAYER_NAME: &str = "Pagador PIX";
const DEFAULT_PAYER_KEY: &str = "pix";
const DEFAULT_DESCRIPTION: &str = "Recebimento PIX";

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Exact conversion of a BRL amount to cents.
pub fn to_cents(amount: Decimal) -> Option<i64> {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Parse an entry date: RFC 3339, a naive date-time (taken as UTC) or a date.
pub fn parse_date(value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value?.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Whether an entry is a credit (`tipo_operacao == "credito"`).
pub fn is_credit(entry: &Value) -> bool {
    entry
        .get("tipo_operacao")
        .and_then(Value::as_str)
        .is_some_and(|kind| kind.trim().eq_ignore_ascii_case("credito"))
}

/// Map one statement entry to a transaction.
///
/// Returns `None` for entries without payment details, without an amount
/// or with a zero amount. Blank strings count as missing everywhere.
///
/// # Fallbacks
///
/// - `tx_id`: `txid`, `id_transferencia`, `id_pagamento`, `id_lancamento`, a fresh UUID
/// - `end_to_end_id`: `id_transferencia`, `id_pagamento`, `id_lancamento`, `tx_id`
/// - `payer_name`: debited name, credited name, `Pagador PIX`
/// - `payer_key`: debited document, debited account, credited key, credited account, `pix`
/// - `description`: `literal_lancamento`, payer message, `tipo_pix`, `Recebimento PIX`
/// - `occurred_at`: `now` when the date is missing or unparsable
///
/// Identifiers and payer fields are cut to their column widths.
pub fn map_lancamento(
    entry: &Value,
    organization_id: Uuid,
    now: DateTime<Utc>,
) -> Option<NewPixTransaction> {
    let lancamento: Lancamento = match serde_json::from_value(entry.clone()) {
        Ok(lancamento) => lancamento,
        Err(e) => {
            tracing::warn!(error = %e, "Skipping malformed Itaú entry");
            return None;
        }
    };

    let pagamento = lancamento.detalhe_pagamento.as_ref()?;

    let amount = pagamento
        .valor
        .or_else(|| pagamento.detalhe_valor.as_ref().and_then(|d| d.valor))?;
    if amount.is_zero() {
        return None;
    }
    let amount_cents = to_cents(amount)?;

    let occurred_at = parse_date(pagamento.data.as_deref()).unwrap_or(now);

    let fallback_id = non_blank(&pagamento.id_transferencia)
        .or_else(|| non_blank(&pagamento.id_pagamento))
        .or_else(|| non_blank(&lancamento.id_lancamento));

    let tx_id = non_blank(&pagamento.txid)
        .or(fallback_id)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string());

    let end_to_end_id = fallback_id
        .map(str::to_string)
        .unwrap_or_else(|| tx_id.clone());

    let debitado = pagamento.debitado.as_ref();
    let creditado = pagamento.creditado.as_ref();

    let payer_name = debitado
        .and_then(|d| non_blank(&d.nome))
        .or_else(|| creditado.and_then(|c| non_blank(&c.nome)))
        .unwrap_or(DEFAULT_PAYER_NAME);

    let payer_key = debitado
        .and_then(|d| non_blank(&d.numero_documento).or_else(|| non_blank(&d.conta)))
        .or_else(|| {
            creditado.and_then(|c| {
                non_blank(&c.chave_enderecamento).or_else(|| non_blank(&c.conta))
            })
        })
        .unwrap_or(DEFAULT_PAYER_KEY);

    let description = non_blank(&lancamento.literal_lancamento)
        .or_else(|| non_blank(&pagamento.texto_resposta_pagador))
        .or_else(|| non_blank(&lancamento.tipo_pix))
        .unwrap_or(DEFAULT_DESCRIPTION);

    Some(NewPixTransaction {
        organization_id,
        tx_id,
        end_to_end_id,
        amount_cents,
        occurred_at,
        payer_name: payer_name.to_string(),
        payer_key: payer_key.to_string(),
        description: description.to_string(),
        raw_json: entry.clone(),
    }
    .bounded())
}

/// Credits of a batch of entries, mapped to transactions.
pub fn map_credits(entries: &[Value], organization_id: Uuid) -> Vec<NewPixTransaction> {
    let now = Utc::now();
    entries
        .iter()
        .filter(|entry| is_credit(entry))
        .filter_map(|entry| map_lancamento(entry, organization_id, now))
        .collect()
}

/// Entries carried by a response or webhook body.
///
/// Accepts an array of entries, an object wrapping them in `lancamentos`
/// or `data`, or a single entry.
pub fn entries_from_body(body: Value) -> Vec<Value> {
    match body {
        Value::Array(entries) => entries,
        Value::Object(mut object) => {
            for key in ["lancamentos", "data"] {
                if matches!(object.get(key), Some(Value::Array(_))) {
                    if let Some(Value::Array(entries)) = object.remove(key) {
                        return entries;
                    }
                }
            }
            vec![Value::Object(object)]
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::pix_transaction::{MAX_ID_CHARS, MAX_PARTY_CHARS};
    use chrono::TimeZone;
    use serde_json::json;
    use std::str::FromStr;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn full_entry() -> Value {
        json!({
            "id_lancamento": "LANC-1",
            "literal_lancamento": "PIX RECEBIDO ANA",
            "tipo_operacao": "credito",
            "tipo_pix": "pix_chave",
            "detalhe_pagamento": {
                "id_pagamento": "PAG-1",
                "id_transferencia": "E60701190202506011200ABCDEF",
                "txid": "TX-ITAU-1",
                "valor": 150.75,
                "data": "2025-06-01T11:58:00-03:00",
                "texto_resposta_pagador": "obrigado",
                "debitado": { "nome": "Ana Souza", "numero_documento": "12345678900" },
                "creditado": { "nome": "Org Demo", "chave_enderecamento": "pix@demo.com" }
            }
        })
    }

    #[test]
    fn full_entry_maps_every_field() {
        let org = Uuid::new_v4();
        let tx = map_lancamento(&full_entry(), org, now()).unwrap();

        assert_eq!(tx.organization_id, org);
        assert_eq!(tx.tx_id, "TX-ITAU-1");
        assert_eq!(tx.end_to_end_id, "E60701190202506011200ABCDEF");
        assert_eq!(tx.amount_cents, 15075);
        assert_eq!(tx.occurred_at, Utc.with_ymd_and_hms(2025, 6, 1, 14, 58, 0).unwrap());
        assert_eq!(tx.payer_name, "Ana Souza");
        assert_eq!(tx.payer_key, "12345678900");
        assert_eq!(tx.description, "PIX RECEBIDO ANA");
        assert_eq!(tx.raw_json, full_entry());
    }

    #[test]
    fn minimal_entry_uses_fallbacks() {
        let entry = json!({
            "tipo_operacao": "credito",
            "detalhe_pagamento": { "detalhe_valor": { "valor": "10.5" }, "data": "garbage" }
        });

        let tx = map_lancamento(&entry, Uuid::nil(), now()).unwrap();

        assert_eq!(tx.amount_cents, 1050);
        assert_eq!(tx.occurred_at, now());
        assert_eq!(tx.tx_id.len(), 32);
        assert_eq!(tx.end_to_end_id, tx.tx_id);
        assert_eq!(tx.payer_name, "Pagador PIX");
        assert_eq!(tx.payer_key, "pix");
        assert_eq!(tx.description, "Recebimento PIX");
    }

    #[test]
    fn blank_strings_count_as_missing() {
        let entry = json!({
            "id_lancamento": "LANC-9",
            "literal_lancamento": "  ",
            "tipo_pix": "pix_qrcode",
            "detalhe_pagamento": {
                "txid": "",
                "id_transferencia": " ",
                "valor": 1,
                "debitado": { "nome": "", "conta": "0001-2" },
                "creditado": { "nome": "Recebedor" }
            }
        });

        let tx = map_lancamento(&entry, Uuid::nil(), now()).unwrap();

        assert_eq!(tx.tx_id, "LANC-9");
        assert_eq!(tx.end_to_end_id, "LANC-9");
        assert_eq!(tx.payer_name, "Recebedor");
        assert_eq!(tx.payer_key, "0001-2");
        assert_eq!(tx.description, "pix_qrcode");
    }

    #[test]
    fn overlong_fields_are_cut_to_column_widths() {
        let mut entry = full_entry();
        entry["detalhe_pagamento"]["txid"] = json!("");
        entry["detalhe_pagamento"]["id_transferencia"] = json!("E".repeat(200));
        entry["detalhe_pagamento"]["debitado"]["nome"] = json!("N".repeat(1000));
        entry["detalhe_pagamento"]["debitado"]["numero_documento"] = json!("9".repeat(300));

        let tx = map_lancamento(&entry, Uuid::nil(), now()).unwrap();

        assert_eq!(tx.tx_id, "E".repeat(MAX_ID_CHARS));
        assert_eq!(tx.end_to_end_id, "E".repeat(MAX_ID_CHARS));
        assert_eq!(tx.payer_name.len(), MAX_PARTY_CHARS);
        assert_eq!(tx.payer_key.len(), MAX_PARTY_CHARS);
        assert_eq!(tx.raw_json, entry);
    }

    #[test]
    fn entries_without_payment_or_amount_are_dropped() {
        let no_details = json!({ "tipo_operacao": "credito" });
        let no_amount = json!({ "tipo_operacao": "credito", "detalhe_pagamento": { "txid": "A" } });
        let zero = json!({ "tipo_operacao": "credito", "detalhe_pagamento": { "valor": 0 } });

        for entry in [no_details, no_amount, zero] {
            assert!(map_lancamento(&entry, Uuid::nil(), now()).is_none());
        }
    }

    #[test]
    fn only_credits_are_kept() {
        let mut debit = full_entry();
        debit["tipo_operacao"] = json!("debito");
        let mut upper = full_entry();
        upper["tipo_operacao"] = json!("CREDITO");

        let transactions = map_credits(&[debit, upper, json!({ "valor": 1 })], Uuid::nil());

        assert_eq!(transactions.len(), 1);
    }

    #[test]
    fn cents_conversion_is_exact() {
        assert_eq!(to_cents(Decimal::from_str("0.01").unwrap()), Some(1));
        assert_eq!(to_cents(Decimal::from_str("1234.56").unwrap()), Some(123456));
        assert_eq!(to_cents(Decimal::from_str("0.105").unwrap()), Some(11));
        assert_eq!(to_cents(Decimal::from_str("19.99").unwrap()), Some(1999));
    }

    #[test]
    fn dates_accept_several_formats() {
        assert_eq!(
            parse_date(Some("2025-06-01T10:00:00Z")),
            Some(Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap())
        );
        assert_eq!(
            parse_date(Some("2025-06-01T10:00:00")),
            Some(Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap())
        );
        assert_eq!(
            parse_date(Some("2025-06-01")),
            Some(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_date(Some("01/06/2025")), None);
        assert_eq!(parse_date(None), None);
    }

    #[test]
    fn body_shapes_are_unwrapped() {
        assert_eq!(entries_from_body(json!([{ "a": 1 }, { "b": 2 }])).len(), 2);
        assert_eq!(entries_from_body(json!({ "lancamentos": [{ "a": 1 }] })).len(), 1);
        assert_eq!(entries_from_body(json!({ "data": [] })).len(), 0);
        assert_eq!(entries_from_body(json!({ "tipo_operacao": "credito" })).len(), 1);
        assert!(entries_from_body(json!("text")).is_empty());
    }
}
