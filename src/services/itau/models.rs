//! Itaú PIX API payloads.
//!
//! Every field is optional; the bank omits whatever does not apply to an
//! entry and the mapper supplies fallbacks.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Statement entry (`lançamento`) of the PIX statement API and webhooks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Lancamento {
    pub id_lancamento: Option<String>,
    pub literal_lancamento: Option<String>,
    pub tipo_lancamento: Option<String>,
    pub tipo_operacao: Option<String>,
    pub tipo_pix: Option<String>,
    pub detalhe_pagamento: Option<DetalhePagamento>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetalhePagamento {
    pub id_pagamento: Option<String>,
    pub id_transferencia: Option<String>,
    pub txid: Option<String>,
    pub valor: Option<Decimal>,
    pub detalhe_valor: Option<DetalheValor>,
    pub data: Option<String>,
    pub texto_resposta_pagador: Option<String>,
    pub debitado: Option<ContaBancaria>,
    pub creditado: Option<ContaBancaria>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetalheValor {
    pub valor: Option<Decimal>,
    pub saque: Option<Decimal>,
    pub troco: Option<Decimal>,
    pub compra: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContaBancaria {
    pub nome: Option<String>,
    pub numero_documento: Option<String>,
    pub conta: Option<String>,
    pub agencia: Option<String>,
    pub chave_enderecamento: Option<String>,
}

/// OAuth client-credentials token response.
#[derive(Debug, Deserialize)]
pub struct OAuthTokenResponse {
    pub access_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<i64>,
}

/// Body of `POST /leituras_qrcodes_pix`, used to probe credentials.
#[derive(Debug, Serialize)]
pub struct LeituraQrcodeRequest {
    pub numero_documento_pagador: &'static str,
    pub qrcode_emv: &'static str,
    pub e2e: &'static str,
}

/// Fixed QR-code read used by the credential test. The bank rejects it
/// with 400/422 once the credentials themselves are accepted.
pub const TEST_LEITURA: LeituraQrcodeRequest = LeituraQrcodeRequest {
    numero_documento_pagador: "65481904594",
    qrcode_emv: "00020101021226880014BR.GOV.BCB.PIX2565pix.example.com/qr/v2/25165e3c10614890b5a438f251d954a65204000053039865802BR5925PMDTESTE6009SAOPAULO62070503***6304E2B2",
    e2e: "E08561701202208271525CGPXCDAPPNO",
};
