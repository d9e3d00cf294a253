use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One row of the `paystubs` table: a single earning/deduction line of a
/// monthly paystub. The table is denormalized: header-level fields
/// (function, bank account, bases, totals, competency) repeat on every row
/// of the same cpf + ref_mes_ano group.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Paystub {
    pub id: String,
    pub cpf: String,
    pub cracha: String,
    pub dmtu: String,
    pub funcao: String,
    pub nome_func: String,
    pub cod_area: i32,
    pub desc_area: String,
    pub desc_departamento: String,

    // Event line fields
    pub cod_evento: String,
    pub evento: String,
    /// "P" earning, "D" deduction
    #[schema(example = "P")]
    pub tipo_evento: String,
    #[schema(value_type = f64)]
    pub referencia: Decimal,
    #[schema(value_type = f64)]
    pub valor: Decimal,

    // Bank account
    pub cod_agencia: String,
    pub conta: String,

    #[schema(value_type = Option<f64>)]
    pub provento: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub desconto: Option<Decimal>,

    // Tax/FGTS bases
    #[schema(value_type = Option<f64>)]
    pub base_salarial: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub base_inss: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub base_fgts: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub fgts: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub base_irrf: Option<Decimal>,

    // Period totals, identical across all rows of the same group
    #[schema(value_type = Option<f64>)]
    pub total_proventos: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub total_descontos: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub total_liquido: Option<Decimal>,

    // Pay period
    #[schema(value_type = String, example = "2025-04-01T00:00:00")]
    pub competencia: NaiveDateTime,
    #[schema(example = "ABRIL")]
    pub nome_mes: String,
    pub ano: i32,
    #[schema(example = "ABRIL/2025")]
    pub ref_mes_ano: String,

    #[schema(value_type = String, format = "date-time")]
    pub data_adm: NaiveDateTime,
    #[schema(value_type = String, format = "date-time")]
    pub data_nasc: NaiveDateTime,
    pub nome_mae: Option<String>,

    /// Payroll run number
    pub folha: i32,
    pub status: Option<String>,
}
