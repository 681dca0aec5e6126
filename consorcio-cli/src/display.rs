use std::collections::HashSet;

use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};

use consorcio_analysis::runs::{RunSummary, composition};
use consorcio_db::db::GroupSummary;
use consorcio_db::models::{
    CatchmentRecord, GapRecord, OpportunityRecord, QuotaId, QuotaStatus, RunRecord,
};
use consorcio_db::universe::QuotaUniverse;

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn percent(part: usize, total: QuotaId) -> String {
    if total == 0 {
        return "—".to_string();
    }
    format!("{:.2}%", part as f64 / total as f64 * 100.0)
}

fn join_ids(ids: &[QuotaId]) -> String {
    ids.iter()
        .map(|q| q.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Short form for long lists: first and last few ids.
fn abbreviate_ids(ids: &[QuotaId], keep: usize) -> String {
    if ids.len() <= keep * 2 {
        return join_ids(ids);
    }
    format!(
        "{} … {} ({} cotas)",
        join_ids(&ids[..keep]),
        join_ids(&ids[ids.len() - keep..]),
        ids.len()
    )
}

fn status_color(status: QuotaStatus) -> Color {
    match status {
        QuotaStatus::Contemplated => Color::Green,
        QuotaStatus::Available => Color::Yellow,
        QuotaStatus::Owned => Color::Blue,
    }
}

pub fn display_import_summary(name: &str, universe: &QuotaUniverse, bids: usize) {
    println!("Importação concluída : {name}");
    println!("  Total de cotas : {}", universe.total());
    println!("  Contempladas   : {}", universe.contemplated().len());
    println!("  Ativas         : {}", universe.owned().len());
    println!("  Disponíveis    : {}", universe.available().len());
    if bids > 0 {
        println!("  Lance 25%      : {bids}");
    }
}

pub fn display_groups(groups: &[GroupSummary]) {
    if groups.is_empty() {
        println!("Nenhum grupo importado.");
        return;
    }

    let mut table = new_table(vec![
        "Grupo",
        "Cotas",
        "Contempladas",
        "Ativas",
        "Disponíveis",
        "Importado em",
    ]);
    for group in groups {
        table.add_row(vec![
            group.name.clone(),
            group.total.to_string(),
            group.contemplated.to_string(),
            group.owned.to_string(),
            group.available.to_string(),
            group.imported_at.clone(),
        ]);
    }
    println!("{table}");
}

pub fn display_summary(name: &str, universe: &QuotaUniverse, bids: &[QuotaId]) {
    let total = universe.total();
    println!("\n📋 Grupo {name} ({total} cotas)\n");

    let mut table = new_table(vec!["Situação", "Cotas", "Proporção"]);
    for status in [
        QuotaStatus::Contemplated,
        QuotaStatus::Owned,
        QuotaStatus::Available,
    ] {
        let count = match status {
            QuotaStatus::Contemplated => universe.contemplated().len(),
            QuotaStatus::Owned => universe.owned().len(),
            QuotaStatus::Available => universe.available().len(),
        };
        table.add_row(vec![
            Cell::new(status.to_string()).fg(status_color(status)),
            Cell::new(count),
            Cell::new(percent(count, total)),
        ]);
    }
    if !bids.is_empty() {
        table.add_row(vec![
            Cell::new("lance 25%").fg(Color::Red),
            Cell::new(bids.len()),
            Cell::new(percent(bids.len(), total)),
        ]);
    }
    println!("{table}");
}

pub fn display_runs(runs: &[RunRecord], summary: &RunSummary, universe: &QuotaUniverse, top: usize) {
    println!("\n🔗 Sequências de cotas disponíveis ou contempladas\n");
    println!("  Candidatas      : {}", summary.candidates);
    println!("  Em sequências   : {}", summary.in_runs);
    println!("  Isoladas        : {}", summary.isolated);
    println!("  Sequências      : {}", summary.run_count);
    println!("  Tamanho médio   : {:.2}\n", summary.mean_length);

    if runs.is_empty() {
        println!("Nenhuma sequência encontrada.");
        return;
    }

    let mut table = new_table(vec![
        "#",
        "Início",
        "Fim",
        "Tamanho",
        "Disponíveis",
        "Contempladas",
        "Cotas",
    ]);
    for (i, run) in runs.iter().take(top).enumerate() {
        let mix = composition(run, universe);
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(run.start),
            Cell::new(run.end),
            Cell::new(run.length),
            Cell::new(mix.available).fg(Color::Yellow),
            Cell::new(mix.contemplated).fg(Color::Green),
            Cell::new(abbreviate_ids(&run.members, 4)),
        ]);
    }
    println!("{table}");
    if runs.len() > top {
        println!("… e mais {} sequências", runs.len() - top);
    }
}

pub fn display_gaps(gaps: &[GapRecord], top: usize) {
    println!("\n🕳  Lacunas entre cotas ativas\n");
    if gaps.is_empty() {
        println!("Nenhuma lacuna encontrada.");
        return;
    }

    let mut table = new_table(vec![
        "#",
        "Intervalo",
        "Tamanho",
        "Contempladas",
        "Disponíveis",
        "Segurança",
        "Limites",
        "Sugestão",
    ]);
    for (i, gap) in gaps.iter().take(top).enumerate() {
        let (lower_ok, upper_ok) = gap.boundaries_purchasable();
        let suggestion = if lower_ok || upper_ok {
            let mut ids = Vec::new();
            if lower_ok {
                ids.push(gap.lower_boundary);
            }
            if upper_ok {
                ids.push(gap.upper_boundary);
            }
            format!("limites {}", join_ids(&ids))
        } else if gap.purchasable_inside.is_empty() {
            "—".to_string()
        } else {
            format!("centro {}", join_ids(gap.central_purchasable(3)))
        };

        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(format!("{}–{}", gap.start, gap.end)),
            Cell::new(gap.size),
            Cell::new(gap.contemplated_count).fg(Color::Green),
            Cell::new(gap.available_count).fg(Color::Yellow),
            Cell::new(format!("{:.0}%", gap.safety() * 100.0)),
            Cell::new(format!(
                "{} ({}) / {} ({})",
                gap.lower_boundary, gap.lower_class, gap.upper_boundary, gap.upper_class
            )),
            Cell::new(suggestion),
        ]);
    }
    println!("{table}");
}

pub fn display_catchment_table(records: &[CatchmentRecord], total: QuotaId, top: usize) {
    println!("\n🎯 Captação das cotas ativas\n");
    if records.is_empty() {
        println!("Nenhuma cota ativa: nenhum sorteio tem vencedor.");
        return;
    }

    let mut table = new_table(vec!["#", "Cota", "Sorteios", "Probabilidade", "Faixa"]);
    for (i, record) in records.iter().take(top).enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(record.quota).fg(Color::Blue),
            Cell::new(record.draw_count),
            Cell::new(format!("{:.2}%", record.share(total) * 100.0)),
            Cell::new(draw_span(record)),
        ]);
    }
    println!("{table}");

    let resolved: usize = records.iter().map(|r| r.draw_count).sum();
    println!(
        "{} cotas ativas, {resolved}/{total} sorteios com vencedor",
        records.len()
    );
}

fn draw_span(record: &CatchmentRecord) -> String {
    match (record.draws.first(), record.draws.last()) {
        (Some(first), Some(last)) if first == last => first.to_string(),
        (Some(first), Some(last)) => format!("{first}–{last}"),
        _ => "—".to_string(),
    }
}

pub fn display_catchment(record: &CatchmentRecord, total: QuotaId, simulated: bool) {
    let label = if simulated {
        "Captação simulada (se comprada)"
    } else {
        "Captação"
    };
    println!("\n🎯 {label} da cota {}\n", record.quota);
    if record.draw_count == 0 {
        println!("A cota {} não vence nenhum sorteio.", record.quota);
        return;
    }
    println!("  Sorteios     : {}", record.draw_count);
    println!("  Probabilidade: {:.2}%", record.share(total) * 100.0);
    println!("  Números      : {}", abbreviate_ids(&record.draws, 10));
}

pub fn display_purchases(records: &[CatchmentRecord], total: QuotaId, top: usize) {
    println!("\n🛒 Melhores compras (captação se comprada)\n");
    if records.is_empty() {
        println!("Nenhuma cota disponível para compra.");
        return;
    }

    let mut table = new_table(vec!["#", "Cota", "Sorteios", "Probabilidade", "Faixa"]);
    for (i, record) in records.iter().take(top).enumerate() {
        let quota = Cell::new(record.quota).fg(Color::Yellow);
        let quota = if i == 0 {
            quota.add_attribute(Attribute::Bold)
        } else {
            quota
        };
        table.add_row(vec![
            Cell::new(i + 1),
            quota,
            Cell::new(record.draw_count),
            Cell::new(format!("{:.2}%", record.share(total) * 100.0)),
            Cell::new(draw_span(record)),
        ]);
    }
    println!("{table}");
}

pub fn display_opportunities(
    opportunities: &[OpportunityRecord],
    universe: &QuotaUniverse,
    top: usize,
) {
    println!("\n📐 Oportunidades de pontas\n");
    if opportunities.is_empty() {
        println!("Nenhuma oportunidade com esses parâmetros.");
        return;
    }

    let count = opportunities.len() as f64;
    let mean_length = opportunities.iter().map(|o| o.length as f64).sum::<f64>() / count;
    let mean_fraction = opportunities.iter().map(|o| o.occupied_fraction).sum::<f64>() / count;
    println!("  Oportunidades     : {}", opportunities.len());
    println!("  Tamanho médio     : {mean_length:.1}");
    println!("  Ocupação média    : {:.1}%\n", mean_fraction * 100.0);

    let mut table = new_table(vec![
        "#",
        "Pontas",
        "Tamanho",
        "Ocupadas",
        "Disponíveis no meio",
        "Ocupação",
        "Pontuação",
    ]);
    for (i, opp) in opportunities.iter().take(top).enumerate() {
        let inside = opp.interior_available_ids(universe);
        let fraction = Cell::new(format!("{:.1}%", opp.occupied_fraction * 100.0));
        let fraction = if opp.interior_available == 0 {
            fraction.fg(Color::Green)
        } else {
            fraction
        };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(format!("{} + {}", opp.start, opp.end)).fg(Color::Yellow),
            Cell::new(opp.length),
            Cell::new(format!("{}/{}", opp.interior_occupied, opp.interior_size)),
            Cell::new(if inside.is_empty() {
                "—".to_string()
            } else {
                abbreviate_ids(&inside, 3)
            }),
            fraction,
            Cell::new(format!("{:.1}", opp.score)),
        ]);
    }
    println!("{table}");
}

/// Near-square matrix, one colored cell per quota. A 25% bid takes priority
/// over the status color; highlighted quotas are bold.
pub fn display_grid(
    name: &str,
    universe: &QuotaUniverse,
    bids: &[QuotaId],
    highlight: &HashSet<QuotaId>,
    numbers: bool,
) {
    let total = universe.total();
    let cols = grid_columns(total);
    let width = total.to_string().len();
    let bids: HashSet<QuotaId> = bids.iter().copied().collect();

    println!("\n🗺  Grupo {name} ({total} cotas, {cols} colunas)\n");

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);

    let ids: Vec<QuotaId> = universe.ids().collect();
    for row in ids.chunks(cols as usize) {
        let cells: Vec<Cell> = row
            .iter()
            .map(|&id| {
                let color = if bids.contains(&id) {
                    Color::Red
                } else {
                    universe.status(id).map_or(Color::White, status_color)
                };
                let text = if numbers {
                    format!("{id:>width$}")
                } else {
                    "■".to_string()
                };
                let cell = Cell::new(text).fg(color);
                if highlight.contains(&id) {
                    cell.add_attribute(Attribute::Bold)
                        .add_attribute(Attribute::Underlined)
                } else {
                    cell
                }
            })
            .collect();
        table.add_row(cells);
    }
    println!("{table}");

    let mut legend = new_table(vec!["Cor", "Situação", "Cotas"]);
    legend.add_row(vec![
        Cell::new("■").fg(Color::Green),
        Cell::new(QuotaStatus::Contemplated),
        Cell::new(universe.contemplated().len()),
    ]);
    legend.add_row(vec![
        Cell::new("■").fg(Color::Yellow),
        Cell::new(QuotaStatus::Available),
        Cell::new(universe.available().len()),
    ]);
    legend.add_row(vec![
        Cell::new("■").fg(Color::Blue),
        Cell::new(QuotaStatus::Owned),
        Cell::new(universe.owned().len()),
    ]);
    if !bids.is_empty() {
        legend.add_row(vec![
            Cell::new("■").fg(Color::Red),
            Cell::new("lance 25%"),
            Cell::new(bids.len()),
        ]);
    }
    if !highlight.is_empty() {
        legend.add_row(vec![
            Cell::new("■").add_attribute(Attribute::Bold),
            Cell::new("maiores sequências"),
            Cell::new(highlight.len()),
        ]);
    }
    println!("{legend}");
}

fn grid_columns(total: QuotaId) -> QuotaId {
    let total = u64::from(total);
    let mut cols = (total as f64).sqrt().ceil() as u64;
    while cols * cols < total {
        cols += 1;
    }
    cols.max(1) as QuotaId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_columns() {
        assert_eq!(grid_columns(1), 1);
        assert_eq!(grid_columns(9), 3);
        assert_eq!(grid_columns(10), 4);
        assert_eq!(grid_columns(2500), 50);
        assert_eq!(grid_columns(2501), 51);
        assert_eq!(grid_columns(QuotaId::MAX), 65_536);
    }

    #[test]
    fn test_abbreviate_ids() {
        assert_eq!(abbreviate_ids(&[1, 2, 3], 2), "1, 2, 3");
        let long: Vec<QuotaId> = (1..=10).collect();
        assert_eq!(abbreviate_ids(&long, 2), "1, 2 … 9, 10 (10 cotas)");
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(1, 4), "25.00%");
        assert_eq!(percent(0, 0), "—");
    }

    #[test]
    fn test_draw_span() {
        assert_eq!(draw_span(&CatchmentRecord::new(5, vec![3, 4, 5, 6])), "3–6");
        assert_eq!(draw_span(&CatchmentRecord::new(5, vec![5])), "5");
        assert_eq!(draw_span(&CatchmentRecord::new(5, vec![])), "—");
    }
}
