#![allow(dead_code)]

use chrono::NaiveDate;
use fechamento_report::ReportConfig;
use rusqlite::Connection;
use std::path::Path;

pub const SCHEMA: &str = "
CREATE TABLE Financeiro_Contas_Acessos (ID_Usuario INTEGER, ID_Conta INTEGER, Visualizar TEXT);
CREATE TABLE Pesquisa_Transferencias_Busca (
    [ID Conta Origem] INTEGER,
    [ID Conta Destino] INTEGER,
    emissao DATETIME,
    Valor REAL,
    Historico TEXT
);
CREATE TABLE view_Contas_a_Pagar (
    ID_Empresa INTEGER,
    [Plano de Contas] TEXT,
    Conta TEXT,
    [Centro Custo] TEXT,
    emissao DATETIME,
    pagamento DATETIME,
    [Descrição Lançamento] TEXT,
    Valor TEXT,
    ID_Situacao INTEGER
);
CREATE TABLE View_FechamentoCaixa_Resumo (
    ID_Empresa INTEGER,
    ID_Caixa INTEGER,
    DataAbertura DATETIME,
    DataFechamento DATETIME,
    Usuario TEXT,
    Lancamento_Credito REAL,
    Vendas_dinheiro REAL,
    Total_Entradas_Dinheiro REAL
);
CREATE TABLE Pesquisa_Fechamento_Caixas (ID_Caixa INTEGER, ID_Empresa INTEGER, ID_Origem_Caixa INTEGER);
CREATE TABLE Financeiro_Transferencias (ID_Empresa INTEGER, ID_Caixa INTEGER, valor REAL);
CREATE TABLE Fechamento_Caixa_Conferencia_Sangrias (ID_Empresa INTEGER, ID_Caixa INTEGER, apurado_gerente REAL);
CREATE TABLE Pesquisa_Resumo_Conferencia_Apuracao (
    ID_Caixa INTEGER,
    ID_Empresa INTEGER,
    ID_Origem_Caixa INTEGER,
    Diferenca REAL
);
CREATE TABLE Fechamento_Caixas (
    ID_Caixa INTEGER,
    ID_Empresa INTEGER,
    ID_Origem_Caixa INTEGER,
    DataAbertura DATETIME,
    DataFechamento DATETIME
);
";

/// January 2025 for companies 58 and 66, plus rows every query must skip.
pub const JANUARY: &str = "
INSERT INTO Financeiro_Contas_Acessos VALUES (1, 10, 'S'), (1, 30, 'N'), (2, 30, 'S');
INSERT INTO Pesquisa_Transferencias_Busca VALUES
    (10, 20, '2025-01-05 10:00:00', 500.0, 'Sangria loja'),
    (30, 40, '2025-01-06 10:00:00', 70.0, 'Sem acesso'),
    (10, 20, '2025-02-10 10:00:00', 90.0, 'Fora do periodo');

INSERT INTO view_Contas_a_Pagar VALUES
    (66, 'Despesas', '  47 - CAIXA TESOURARIA | BALSAS  ', 'ADM', '2025-01-10 14:30:00', '2025-01-11 00:00:00', 'Sangria', 'R$ 1.000,00', 1),
    (58, 'Pessoal', 'SALARIO PESSOAL', 'RH', '2025-01-15 08:00:00', NULL, 'Salario', 'R$ 2.500,50', 0),
    (58, 'Outros', 'CONTA NOVA', '', '2025-01-20 00:00:00', NULL, 'Sem mapeamento', 'abc', 1),
    (58, 'Outros', 'SALARIO PESSOAL', '', '2025-01-21 00:00:00', NULL, 'Cancelado', 'R$ 9,99', 2),
    (99, 'Outros', 'SALARIO PESSOAL', '', '2025-01-21 00:00:00', NULL, 'Outra empresa', 'R$ 9,99', 1);

INSERT INTO View_FechamentoCaixa_Resumo VALUES
    (58, 1, '2025-01-02 08:00:00', '2025-01-02 18:00:00', 'ana', 50.0, 1000.0, 1050.0),
    (66, 2, '2025-01-03 08:00:00', '2025-01-03 18:00:00', 'bia', 0.0, 200.0, 200.0),
    (66, 3, '2025-01-04 08:00:00', '2025-01-04 18:00:00', 'bia', 0.0, 999.0, 999.0);
INSERT INTO Pesquisa_Fechamento_Caixas VALUES (1, 58, 1), (2, 66, 1), (3, 66, 2);
INSERT INTO Financeiro_Transferencias VALUES (58, 1, 900.0);
INSERT INTO Fechamento_Caixa_Conferencia_Sangrias VALUES (58, 1, 1048.0), (66, 2, 195.0);

INSERT INTO Pesquisa_Resumo_Conferencia_Apuracao VALUES (1, 58, 1, -2.0);
INSERT INTO Fechamento_Caixas VALUES (1, 58, 1, '2025-01-02 08:00:00', '2025-01-02 18:00:00');
";

pub fn create_store(dir: &Path, script: &str) -> String {
    let path = dir.join("loja.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(script).unwrap();
    path.to_string_lossy().to_string()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn config(database: &str, output: &str, start: NaiveDate, end: NaiveDate) -> ReportConfig {
    let mut config = ReportConfig::default();
    config.database.path = database.to_string();
    config.output.path = output.to_string();
    config.report.start = Some(start);
    config.report.end = Some(end);
    config
}

pub fn files_in(dir: &Path) -> Vec<String> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect(),
        Err(_) => Vec::new(),
    }
}
