//! The four report queries and their sequential execution.
//!
//! Dates and the access user are bound parameters (`:start`, `:end`,
//! `:user`). The company allow-list is written into the SQL text; it only
//! ever holds integers from the configuration.

use crate::domain::model::{QueryResult, ReportData};
use crate::domain::ports::{Connector, QueryParams, QuerySession};
use crate::utils::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryId {
    Transfers,
    Payables,
    CashClosing,
    Discrepancies,
}

impl QueryId {
    pub const ALL: [QueryId; 4] = [
        QueryId::Transfers,
        QueryId::Payables,
        QueryId::CashClosing,
        QueryId::Discrepancies,
    ];

    pub fn sheet_name(&self) -> &'static str {
        match self {
            QueryId::Transfers => "Relatorio",
            QueryId::Payables => "Contas a Pagar",
            QueryId::CashClosing => "Fechamento Caixa",
            QueryId::Discrepancies => "Vendas Trocadas",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportQuery {
    pub id: QueryId,
    pub sql: String,
}

fn id_list(company_ids: &[i64]) -> String {
    if company_ids.is_empty() {
        // IN () is a syntax error; an impossible id keeps the query valid and empty
        return "NULL".to_string();
    }
    company_ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

pub fn report_queries(company_ids: &[i64]) -> Vec<ReportQuery> {
    let ids = id_list(company_ids);
    QueryId::ALL
        .iter()
        .map(|&id| ReportQuery {
            id,
            sql: build_sql(id, &ids),
        })
        .collect()
}

fn build_sql(id: QueryId, ids: &str) -> String {
    match id {
        QueryId::Transfers => "\
SELECT *
FROM Pesquisa_Transferencias_Busca
WHERE (
  [ID Conta Origem] IN (SELECT ID_Conta FROM Financeiro_Contas_Acessos WHERE ID_Usuario = :user AND IFNULL(Visualizar, 'N') = 'S')
  OR
  [ID Conta Destino] IN (SELECT ID_Conta FROM Financeiro_Contas_Acessos WHERE ID_Usuario = :user AND IFNULL(Visualizar, 'N') = 'S')
)
AND date(emissao) BETWEEN :start AND :end
ORDER BY emissao DESC"
            .to_string(),
        QueryId::Payables => format!(
            "\
SELECT ID_Empresa, [Plano de Contas], Conta, [Centro Custo], emissao, pagamento, [Descrição Lançamento], Valor
FROM view_Contas_a_Pagar
WHERE ID_Situacao IN (0, 1)
  AND date(emissao) BETWEEN :start AND :end
  AND ID_Empresa IN ({ids})"
        ),
        QueryId::CashClosing => format!(
            "\
SELECT
  r.ID_Empresa,
  r.ID_Caixa,
  substr(r.DataAbertura, 1, 10) AS Data_Abertura_Str,
  r.DataAbertura AS Data_Abertura,
  r.DataFechamento AS Data_Fechamento,
  r.Usuario AS [Usuário],
  CAST(r.Lancamento_Credito AS REAL) AS Suprimento,
  CAST(r.Vendas_dinheiro AS REAL) AS Vendas_dinheiro,
  CAST(r.Total_Entradas_Dinheiro AS REAL) AS Total_Ent_Dinh,
  CAST(IFNULL((SELECT SUM(IFNULL(t.valor, 0)) FROM Financeiro_Transferencias t
               WHERE t.ID_Empresa = r.ID_Empresa AND t.ID_Caixa = r.ID_Caixa), 0) AS REAL) AS Transf_Tesour,
  CAST(IFNULL((SELECT SUM(fg.apurado_gerente) FROM Fechamento_Caixa_Conferencia_Sangrias fg
               WHERE fg.ID_Empresa = r.ID_Empresa AND fg.ID_Caixa = r.ID_Caixa)
            - (SELECT SUM(IFNULL(t2.valor, 0)) FROM Financeiro_Transferencias t2
               WHERE t2.ID_Empresa = r.ID_Empresa AND t2.ID_Caixa = r.ID_Caixa), 0) AS REAL) AS Ap_Ger_Nao_Trans,
  CAST((SELECT SUM(fg2.apurado_gerente) FROM Fechamento_Caixa_Conferencia_Sangrias fg2
        WHERE fg2.ID_Empresa = r.ID_Empresa AND fg2.ID_Caixa = r.ID_Caixa) AS REAL) AS Apur_Ger_total,
  CAST((SELECT SUM(fg3.apurado_gerente) FROM Fechamento_Caixa_Conferencia_Sangrias fg3
        WHERE fg3.ID_Empresa = r.ID_Empresa AND fg3.ID_Caixa = r.ID_Caixa)
       - r.Total_Entradas_Dinheiro AS REAL) AS SaldoFinal,
  CASE WHEN ((SELECT SUM(fg4.apurado_gerente) FROM Fechamento_Caixa_Conferencia_Sangrias fg4
              WHERE fg4.ID_Empresa = r.ID_Empresa AND fg4.ID_Caixa = r.ID_Caixa)
             - r.Total_Entradas_Dinheiro) <= -3 THEN 'Vale' ELSE 'Nao' END AS Vale
FROM View_FechamentoCaixa_Resumo r
INNER JOIN Pesquisa_Fechamento_Caixas c ON r.ID_Caixa = c.ID_Caixa AND r.ID_Empresa = c.ID_Empresa
WHERE r.ID_Empresa IN ({ids})
  AND date(r.DataAbertura) BETWEEN :start AND :end
  AND c.ID_Origem_Caixa = 1
ORDER BY r.ID_Empresa, r.ID_Caixa, r.DataAbertura"
        ),
        QueryId::Discrepancies => format!(
            "\
SELECT pr.*, fc.DataAbertura, fc.DataFechamento
FROM Pesquisa_Resumo_Conferencia_Apuracao pr
INNER JOIN Fechamento_Caixas fc
  ON fc.ID_Caixa = pr.ID_Caixa AND fc.ID_Empresa = pr.ID_Empresa AND fc.ID_Origem_Caixa = pr.ID_Origem_Caixa
WHERE fc.ID_Empresa IN ({ids})
  AND fc.ID_Origem_Caixa = 1
  AND date(fc.DataFechamento) BETWEEN :start AND :end
ORDER BY fc.ID_Caixa"
        ),
    }
}

/// Opens the one session every report query runs on.
pub fn open_session<C: Connector>(connector: &C) -> Result<C::Session> {
    tracing::info!("🔌 Connecting to {}", connector.describe());
    let session = connector.connect()?;
    tracing::info!("✅ Connection established");
    Ok(session)
}

/// Runs every query on `session`, in order. The first failure aborts the
/// run; the session is dropped (and the connection released) on every path.
pub fn execute_all<S: QuerySession>(
    mut session: S,
    queries: &[ReportQuery],
    params: &QueryParams,
) -> Result<ReportData> {
    let mut data = ReportData::default();
    for (position, query) in queries.iter().enumerate() {
        tracing::debug!(
            "Running query {}/{} ({})",
            position + 1,
            queries.len(),
            query.id.sheet_name()
        );
        let result = session.query(&query.sql, params)?;
        tracing::info!(
            "📊 {}: {} rows, {} columns",
            query.id.sheet_name(),
            result.len(),
            result.columns().len()
        );
        *slot(&mut data, query.id) = result;
    }

    Ok(data)
}

fn slot(data: &mut ReportData, id: QueryId) -> &mut QueryResult {
    match id {
        QueryId::Transfers => &mut data.transfers,
        QueryId::Payables => &mut data.payables,
        QueryId::CashClosing => &mut data.cash_closing,
        QueryId::Discrepancies => &mut data.discrepancies,
    }
}
