use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use consorcio_db::models::{GroupSnapshot, QuotaId};

const CONFIG_FILE: &str = "configuracao.json";
const TOTAL_FILE: &str = "total_cotas.txt";
const CONTEMPLATED_CSV: &str = "cotas_contempladas.csv";
const CONTEMPLATED_TXT: &str = "cotas_contempladas.txt";
const AVAILABLE_TXT: &str = "cotas_disponiveis.txt";
const BIDS_TXT: &str = "lance_25.txt";

/// Largest pool accepted; real groups hold a few thousand quotas.
const MAX_TOTAL: QuotaId = 1_000_000;

#[derive(Deserialize)]
struct GroupConfig {
    total_cotas: QuotaId,
}

/// Reads a group folder into a snapshot. The snapshot is not validated here;
/// `GroupSnapshot::universe` (or `save_group`) does that.
pub fn load_group_dir(
    dir: &Path,
    name: Option<&str>,
    total_override: Option<QuotaId>,
) -> Result<GroupSnapshot> {
    if !dir.is_dir() {
        bail!("Pasta do grupo não encontrada: {:?}", dir);
    }

    let name = match name {
        Some(n) => n.to_string(),
        None => dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("Nome do grupo indeterminado para {:?}", dir))?,
    };

    let total = read_total(dir, total_override)?;

    let csv_path = dir.join(CONTEMPLATED_CSV);
    let txt_path = dir.join(CONTEMPLATED_TXT);
    let contemplated = if csv_path.exists() {
        read_contemplated_csv(&csv_path)?
    } else if txt_path.exists() {
        read_id_lines(&txt_path)?
    } else {
        log::warn!("{}: nenhum arquivo de contempladas", name);
        Vec::new()
    };

    let available_path = dir.join(AVAILABLE_TXT);
    let available = if available_path.exists() {
        read_id_lines(&available_path)?
    } else {
        log::warn!("{}: {} ausente, nenhuma cota disponível", name, AVAILABLE_TXT);
        Vec::new()
    };

    let bids_path = dir.join(BIDS_TXT);
    let bids = if bids_path.exists() {
        read_id_lines(&bids_path)?
    } else {
        Vec::new()
    };

    log::info!(
        "{}: {} cotas, {} contempladas, {} disponíveis, {} com lance",
        name,
        total,
        contemplated.len(),
        available.len(),
        bids.len()
    );

    Ok(GroupSnapshot {
        name,
        total,
        contemplated,
        available,
        bids,
    })
}

/// `--total` wins over the folder; otherwise `configuracao.json`, then
/// `total_cotas.txt`.
fn read_total(dir: &Path, total_override: Option<QuotaId>) -> Result<QuotaId> {
    let from_files = read_total_files(dir)?;
    let total = match (total_override, from_files) {
        (Some(t), Some(f)) if t != f => {
            log::warn!("--total {} substitui o total {} da pasta", t, f);
            t
        }
        (Some(t), _) => t,
        (None, Some(f)) => f,
        (None, None) => bail!(
            "Total de cotas desconhecido: crie {} ou {}, ou use --total",
            CONFIG_FILE,
            TOTAL_FILE
        ),
    };
    if total > MAX_TOTAL {
        bail!("Total de {} cotas acima do limite de {}", total, MAX_TOTAL);
    }
    Ok(total)
}

fn read_total_files(dir: &Path) -> Result<Option<QuotaId>> {
    let config_path = dir.join(CONFIG_FILE);
    if config_path.exists() {
        let json = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Não foi possível ler {:?}", config_path))?;
        let config: GroupConfig = serde_json::from_str(&json)
            .with_context(|| format!("total_cotas inválido em {:?}", config_path))?;
        return Ok(Some(config.total_cotas));
    }

    let total_path = dir.join(TOTAL_FILE);
    if total_path.exists() {
        let raw = std::fs::read_to_string(&total_path)
            .with_context(|| format!("Não foi possível ler {:?}", total_path))?;
        let total = raw
            .trim()
            .parse::<QuotaId>()
            .with_context(|| format!("Total inválido em {:?}: '{}'", total_path, raw.trim()))?;
        return Ok(Some(total));
    }

    Ok(None)
}

/// One id per line; blank lines and `#` comments are skipped.
pub fn read_id_lines(path: &Path) -> Result<Vec<QuotaId>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Não foi possível ler {:?}", path))?;
    parse_id_lines(&content).with_context(|| format!("Arquivo {:?}", path))
}

fn parse_id_lines(content: &str) -> Result<Vec<QuotaId>> {
    let mut ids = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let id = line
            .parse::<QuotaId>()
            .with_context(|| format!("linha {}: cota inválida '{}'", idx + 1, line))?;
        ids.push(id);
    }
    Ok(ids)
}

/// `cotas` column; a cell may hold several ids joined by `-`.
fn read_contemplated_csv(path: &Path) -> Result<Vec<QuotaId>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Impossível abrir {:?}", path))?;

    let column = reader
        .headers()
        .with_context(|| format!("Cabeçalho ilegível em {:?}", path))?
        .iter()
        .position(|h| h == "cotas")
        .with_context(|| format!("Coluna 'cotas' ausente em {:?}", path))?;

    let mut ids = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("Erro de leitura em {:?}", path))?;
        let line = record.position().map_or(0, |p| p.line());
        let Some(cell) = record.get(column) else {
            log::warn!("{:?} linha {}: sem coluna 'cotas', ignorada", path, line);
            continue;
        };
        for part in cell.split('-').map(str::trim).filter(|p| !p.is_empty()) {
            let id = part.parse::<QuotaId>().with_context(|| {
                format!("{:?} linha {}: cota inválida '{}'", path, line, part)
            })?;
            ids.push(id);
        }
    }
    Ok(ids)
}
