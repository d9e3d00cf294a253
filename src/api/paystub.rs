use crate::{auth::auth::AuthUser, error::AppError, model::paystub::Paystub};
use actix_web::{HttpResponse, web};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct PaginationQuery {
    #[schema(example = 1)]
    pub page: Option<u32>,
    #[schema(example = 12)]
    pub limit: Option<u32>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct DetailsQuery {
    /// Competency reference, e.g. "ABRIL/2025"
    #[serde(rename = "refMesAno")]
    #[schema(example = "ABRIL/2025")]
    pub ref_mes_ano: String,
}

/// One entry per distinct pay period; totals come straight from the
/// denormalized rows (identical across a group, never recomputed).
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySummary {
    #[schema(example = "ABRIL/2025")]
    pub ref_mes_ano: String,
    #[schema(value_type = String, format = "date-time")]
    pub competencia: NaiveDateTime,
    #[schema(example = "ABRIL")]
    pub nome_mes: String,
    pub ano: i32,
    #[schema(value_type = Option<f64>)]
    pub total_proventos: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub total_descontos: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub total_liquido: Option<Decimal>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedSummaries {
    pub data: Vec<MonthlySummary>,
    /// Number of distinct pay periods for this CPF
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: i64,
}

/// Header of one monthly paystub: the fields shared by every event row of
/// the cpf + ref_mes_ano group.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaystubHeader {
    pub cpf: String,
    pub cracha: String,
    pub dmtu: String,
    pub funcao: String,
    pub nome_func: String,
    pub cod_area: i32,
    pub desc_area: String,
    pub desc_departamento: String,
    pub cod_agencia: String,
    pub conta: String,
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
    #[schema(value_type = Option<f64>)]
    pub total_proventos: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub total_descontos: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub total_liquido: Option<Decimal>,
    #[schema(value_type = String, format = "date-time")]
    pub competencia: NaiveDateTime,
    pub nome_mes: String,
    pub ano: i32,
    pub ref_mes_ano: String,
    #[schema(value_type = String, format = "date-time")]
    pub data_adm: NaiveDateTime,
    #[schema(value_type = String, format = "date-time")]
    pub data_nasc: NaiveDateTime,
    pub nome_mae: Option<String>,
    pub folha: i32,
    pub status: Option<String>,
}

/// One earning/deduction line within a monthly paystub.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaystubEvent {
    pub id: String,
    pub cod_evento: String,
    pub evento: String,
    #[schema(example = "P")]
    pub tipo_evento: String,
    #[schema(value_type = f64)]
    pub referencia: Decimal,
    #[schema(value_type = f64)]
    pub valor: Decimal,
    #[schema(value_type = Option<f64>)]
    pub provento: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub desconto: Option<Decimal>,
}

#[derive(Serialize, ToSchema)]
pub struct MonthlyDetails {
    pub header: PaystubHeader,
    pub events: Vec<PaystubEvent>,
}

fn total_pages(total: i64, limit: u32) -> i64 {
    (total + i64::from(limit) - 1) / i64::from(limit)
}

// Widened before multiplying; page is client-controlled.
fn page_offset(page: u32, limit: u32) -> i64 {
    i64::from(page - 1) * i64::from(limit)
}

/// Split the rows of one cpf + period group into a shared header (taken
/// from the first row) plus the ordered event lines. None on empty input.
fn build_details(rows: Vec<Paystub>) -> Option<MonthlyDetails> {
    let first = rows.first()?;

    let header = PaystubHeader {
        cpf: first.cpf.clone(),
        cracha: first.cracha.clone(),
        dmtu: first.dmtu.clone(),
        funcao: first.funcao.clone(),
        nome_func: first.nome_func.clone(),
        cod_area: first.cod_area,
        desc_area: first.desc_area.clone(),
        desc_departamento: first.desc_departamento.clone(),
        cod_agencia: first.cod_agencia.clone(),
        conta: first.conta.clone(),
        base_salarial: first.base_salarial,
        base_inss: first.base_inss,
        base_fgts: first.base_fgts,
        fgts: first.fgts,
        base_irrf: first.base_irrf,
        total_proventos: first.total_proventos,
        total_descontos: first.total_descontos,
        total_liquido: first.total_liquido,
        competencia: first.competencia,
        nome_mes: first.nome_mes.clone(),
        ano: first.ano,
        ref_mes_ano: first.ref_mes_ano.clone(),
        data_adm: first.data_adm,
        data_nasc: first.data_nasc,
        nome_mae: first.nome_mae.clone(),
        folha: first.folha,
        status: first.status.clone(),
    };

    let events = rows
        .into_iter()
        .map(|row| PaystubEvent {
            id: row.id,
            cod_evento: row.cod_evento,
            evento: row.evento,
            tipo_evento: row.tipo_evento,
            referencia: row.referencia,
            valor: row.valor,
            provento: row.provento,
            desconto: row.desconto,
        })
        .collect();

    Some(MonthlyDetails { header, events })
}

const PAYSTUB_COLUMNS: &str = r#"
    id, cpf, cracha, dmtu, funcao, nome_func, cod_area, desc_area,
    desc_departamento, cod_evento, evento, tipo_evento, referencia, valor,
    cod_agencia, conta, provento, desconto, base_salarial, base_inss,
    base_fgts, fgts, base_irrf, total_proventos, total_descontos,
    total_liquido, competencia, nome_mes, ano, ref_mes_ano, data_adm,
    data_nasc, nome_mae, folha, status
"#;

#[utoipa::path(
    get,
    path = "/api/v1/paystubs",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Monthly summaries, newest first", body = PaginatedSummaries),
        (status = 401)
    ),
    security(("bearer_auth" = [])),
    tag = "Paystubs"
)]
pub async fn list_summaries(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    query: web::Query<PaginationQuery>,
) -> Result<HttpResponse, AppError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(12).clamp(1, 100);
    let offset = page_offset(page, limit);

    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(DISTINCT ref_mes_ano) FROM paystubs WHERE cpf = $1",
    )
    .bind(&auth.cpf)
    .fetch_one(pool.get_ref())
    .await?;

    debug!(cpf = %auth.cpf, total, page, limit, "Fetching monthly summaries");

    let data = sqlx::query_as::<_, MonthlySummary>(
        r#"
        SELECT ref_mes_ano, competencia, nome_mes, ano,
               total_proventos, total_descontos, total_liquido
        FROM paystubs
        WHERE cpf = $1
        GROUP BY ref_mes_ano, competencia, nome_mes, ano,
                 total_proventos, total_descontos, total_liquido
        ORDER BY competencia DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(&auth.cpf)
    .bind(i64::from(limit))
    .bind(offset)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(PaginatedSummaries {
        data,
        total,
        page,
        limit,
        total_pages: total_pages(total, limit),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/paystubs/details",
    params(DetailsQuery),
    responses(
        (status = 200, description = "Header + ordered event lines", body = MonthlyDetails),
        (status = 401),
        (status = 404, description = "No rows for this CPF + period")
    ),
    security(("bearer_auth" = [])),
    tag = "Paystubs"
)]
pub async fn get_details(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    query: web::Query<DetailsQuery>,
) -> Result<HttpResponse, AppError> {
    if query.ref_mes_ano.trim().is_empty() {
        return Err(AppError::BadRequest(
            "refMesAno query parameter is required".to_string(),
        ));
    }

    let sql = format!(
        "SELECT {PAYSTUB_COLUMNS} FROM paystubs \
         WHERE cpf = $1 AND ref_mes_ano = $2 \
         ORDER BY tipo_evento ASC, cod_evento ASC"
    );

    let rows = sqlx::query_as::<_, Paystub>(&sql)
        .bind(&auth.cpf)
        .bind(&query.ref_mes_ano)
        .fetch_all(pool.get_ref())
        .await?;

    match build_details(rows) {
        Some(details) => Ok(HttpResponse::Ok().json(details)),
        None => Err(AppError::NotFound(
            "Paystub details not found for the specified competency reference.".to_string(),
        )),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/paystubs/event/{id}",
    params(("id", description = "Paystub event row id")),
    responses(
        (status = 200, description = "Single event row", body = Paystub),
        (status = 401),
        (status = 404, description = "Missing, or owned by another CPF")
    ),
    security(("bearer_auth" = [])),
    tag = "Paystubs"
)]
pub async fn get_event(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    let sql = format!("SELECT {PAYSTUB_COLUMNS} FROM paystubs WHERE id = $1 AND cpf = $2");

    let event = sqlx::query_as::<_, Paystub>(&sql)
        .bind(&id)
        .bind(&auth.cpf)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| {
            AppError::NotFound("Paystub event not found or access denied.".to_string())
        })?;

    Ok(HttpResponse::Ok().json(event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn row(id: &str, cod_evento: &str, tipo_evento: &str, valor: i64) -> Paystub {
        let competencia = NaiveDate::from_ymd_opt(2025, 4, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        Paystub {
            id: id.to_string(),
            cpf: "12345678909".to_string(),
            cracha: "9001".to_string(),
            dmtu: "01".to_string(),
            funcao: "MOTORISTA".to_string(),
            nome_func: "JOAO DA SILVA".to_string(),
            cod_area: 10,
            desc_area: "OPERACAO".to_string(),
            desc_departamento: "TRAFEGO".to_string(),
            cod_evento: cod_evento.to_string(),
            evento: "EVENTO".to_string(),
            tipo_evento: tipo_evento.to_string(),
            referencia: Decimal::new(3000, 2),
            valor: Decimal::new(valor, 2),
            cod_agencia: "0001".to_string(),
            conta: "12345-6".to_string(),
            provento: None,
            desconto: None,
            base_salarial: Some(Decimal::new(350_000, 2)),
            base_inss: Some(Decimal::new(350_000, 2)),
            base_fgts: Some(Decimal::new(350_000, 2)),
            fgts: Some(Decimal::new(28_000, 2)),
            base_irrf: Some(Decimal::new(320_000, 2)),
            total_proventos: Some(Decimal::new(400_000, 2)),
            total_descontos: Some(Decimal::new(90_000, 2)),
            total_liquido: Some(Decimal::new(310_000, 2)),
            competencia,
            nome_mes: "ABRIL".to_string(),
            ano: 2025,
            ref_mes_ano: "ABRIL/2025".to_string(),
            data_adm: NaiveDate::from_ymd_opt(2015, 3, 2)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            data_nasc: NaiveDate::from_ymd_opt(1990, 5, 17)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            nome_mae: Some("MARIA DAS GRACAS".to_string()),
            folha: 1,
            status: None,
        }
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0, 12), 0);
        assert_eq!(total_pages(12, 12), 1);
        assert_eq!(total_pages(13, 12), 2);
        assert_eq!(total_pages(24, 12), 2);
        assert_eq!(total_pages(1, 12), 1);
    }

    #[test]
    fn page_offset_handles_huge_page_numbers() {
        assert_eq!(page_offset(1, 12), 0);
        assert_eq!(page_offset(3, 12), 24);
        assert_eq!(
            page_offset(u32::MAX, 100),
            i64::from(u32::MAX - 1) * 100
        );
    }

    #[test]
    fn build_details_splits_header_and_events() {
        let rows = vec![
            row("ev-1", "001", "P", 350_000),
            row("ev-2", "101", "D", 28_000),
            row("ev-3", "102", "D", 62_000),
        ];

        let details = build_details(rows).unwrap();
        assert_eq!(details.events.len(), 3);
        assert_eq!(details.header.ref_mes_ano, "ABRIL/2025");
        assert_eq!(details.header.total_liquido, Some(Decimal::new(310_000, 2)));

        // Event order is preserved from the query ordering
        let ids: Vec<&str> = details.events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["ev-1", "ev-2", "ev-3"]);
    }

    #[test]
    fn build_details_on_empty_group_is_none() {
        assert!(build_details(Vec::new()).is_none());
    }

    #[test]
    fn header_totals_come_from_first_row() {
        let mut other = row("ev-2", "101", "D", 1);
        // Denormalization invariant says totals match; if a row disagrees,
        // the first row still wins.
        other.total_liquido = Some(Decimal::new(1, 2));

        let details = build_details(vec![row("ev-1", "001", "P", 2), other]).unwrap();
        assert_eq!(details.header.total_liquido, Some(Decimal::new(310_000, 2)));
    }
}
