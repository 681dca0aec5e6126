mod display;
mod import;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use consorcio_analysis::catchment::{
    catchment, catchment_table, rank_purchases_with, rank_table, what_if_catchment,
};
use consorcio_analysis::config::AnalysisConfig;
use consorcio_analysis::edges::find_opportunities;
use consorcio_analysis::gaps::find_gaps;
use consorcio_analysis::runs::{RunSummary, blocking_candidates, blocking_runs, top_length_tiers};
use consorcio_db::db::{
    StoredGroup, count_groups, db_path, delete_group, list_groups, load_group, migrate, open_db,
    save_group,
};
use consorcio_db::models::QuotaId;
use consorcio_db::rusqlite::Connection;

use crate::display::{
    display_catchment, display_catchment_table, display_gaps, display_grid, display_groups,
    display_import_summary, display_opportunities, display_purchases, display_runs,
    display_summary,
};

#[derive(Parser)]
#[command(name = "consorcio", about = "Analisador de cotas de grupos de consórcio")]
struct Cli {
    /// Caminho da base de dados (padrão: data/consorcio.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Arquivo JSON com os parâmetros da análise
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Clone, Copy)]
struct Output {
    /// Número de linhas exibidas (padrão: top_n da configuração)
    #[arg(short, long)]
    top: Option<usize>,

    /// Saída em JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Importar um grupo a partir de uma pasta
    Import {
        /// Pasta com total_cotas, cotas_contempladas e cotas_disponiveis
        dir: PathBuf,

        /// Nome do grupo (padrão: nome da pasta)
        #[arg(short, long)]
        name: Option<String>,

        /// Total de cotas, substitui o da pasta
        #[arg(short, long)]
        total: Option<QuotaId>,
    },

    /// Listar os grupos importados
    Groups,

    /// Remover um grupo da base
    Remove { group: String },

    /// Mostrar o caminho da base de dados
    DbPath,

    /// Resumo de um grupo
    Summary {
        group: String,
        #[arg(long)]
        json: bool,
    },

    /// Sequências de cotas disponíveis ou contempladas
    Runs {
        group: String,
        #[command(flatten)]
        output: Output,
    },

    /// Lacunas entre cotas ativas
    Gaps {
        group: String,
        #[command(flatten)]
        output: Output,
    },

    /// Captação das cotas ativas, de uma cota, ou simulada para uma compra
    Catchment {
        group: String,

        /// Mostrar apenas a captação desta cota
        #[arg(short, long, conflicts_with = "simulate")]
        quota: Option<QuotaId>,

        /// Simular a compra desta cota disponível
        #[arg(short, long)]
        simulate: Option<QuotaId>,

        #[command(flatten)]
        output: Output,
    },

    /// Classificar as cotas disponíveis pela captação se compradas
    Buy {
        group: String,
        #[command(flatten)]
        output: Output,
    },

    /// Intervalos cujas pontas estão à venda e o meio já está ocupado
    Edges {
        group: String,

        /// Tamanho mínimo do intervalo, pontas incluídas
        #[arg(long)]
        min_length: Option<u32>,

        /// Ocupação mínima do meio, entre 0 e 1
        #[arg(long)]
        min_occupied: Option<f64>,

        /// Tamanho máximo do intervalo
        #[arg(long)]
        max_span: Option<u32>,

        #[command(flatten)]
        output: Output,
    },

    /// Matriz colorida do grupo
    Grid {
        group: String,

        /// Destacar as cotas das maiores sequências
        #[arg(long)]
        highlight: bool,

        /// Mostrar os números das cotas
        #[arg(short, long)]
        numbers: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let path = cli.db.clone().unwrap_or_else(db_path);
    let config = match &cli.config {
        Some(file) => AnalysisConfig::load(file)?,
        None => AnalysisConfig::default(),
    };

    let conn = open_db(&path)?;
    migrate(&conn)?;

    match cli.command {
        Command::Import { dir, name, total } => cmd_import(&conn, &dir, name.as_deref(), total),
        Command::Groups => cmd_groups(&conn),
        Command::Remove { group } => cmd_remove(&conn, &group),
        Command::DbPath => {
            println!("{}", path.display());
            Ok(())
        }
        Command::Summary { group, json } => cmd_summary(&conn, &group, json),
        Command::Runs { group, output } => cmd_runs(&conn, &group, &config, output),
        Command::Gaps { group, output } => cmd_gaps(&conn, &group, &config, output),
        Command::Catchment {
            group,
            quota,
            simulate,
            output,
        } => cmd_catchment(&conn, &group, &config, quota, simulate, output),
        Command::Buy { group, output } => cmd_buy(&conn, &group, &config, output),
        Command::Edges {
            group,
            min_length,
            min_occupied,
            max_span,
            output,
        } => {
            let mut config = config;
            if let Some(v) = min_length {
                config.min_length = v;
            }
            if let Some(v) = min_occupied {
                config.min_occupied_fraction = v;
            }
            if let Some(v) = max_span {
                config.max_span = v;
            }
            cmd_edges(&conn, &group, &config, output)
        }
        Command::Grid {
            group,
            highlight,
            numbers,
        } => cmd_grid(&conn, &group, highlight, numbers),
    }
}

fn fetch_group(conn: &Connection, name: &str) -> Result<StoredGroup> {
    if count_groups(conn)? == 0 {
        bail!("Base vazia. Execute primeiro : consorcio import <pasta>");
    }
    load_group(conn, name)?
        .with_context(|| format!("Grupo '{}' não encontrado (veja: consorcio groups)", name))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Falha ao serializar o resultado")?
    );
    Ok(())
}

fn cmd_import(
    conn: &Connection,
    dir: &Path,
    name: Option<&str>,
    total: Option<QuotaId>,
) -> Result<()> {
    let snapshot = import::load_group_dir(dir, name, total)?;
    let universe = save_group(conn, &snapshot)?;
    display_import_summary(&snapshot.name, &universe, snapshot.bids.len());
    Ok(())
}

fn cmd_groups(conn: &Connection) -> Result<()> {
    let groups = list_groups(conn)?;
    display_groups(&groups);
    Ok(())
}

fn cmd_remove(conn: &Connection, group: &str) -> Result<()> {
    if delete_group(conn, group)? {
        println!("Grupo '{group}' removido.");
    } else {
        println!("Grupo '{group}' não existe.");
    }
    Ok(())
}

fn cmd_summary(conn: &Connection, group: &str, json: bool) -> Result<()> {
    let stored = fetch_group(conn, group)?;
    let u = &stored.universe;
    if json {
        return print_json(&serde_json::json!({
            "name": stored.name,
            "imported_at": stored.imported_at,
            "total": u.total(),
            "contemplated": u.contemplated().len(),
            "owned": u.owned().len(),
            "available": u.available().len(),
            "bids": stored.bids,
        }));
    }
    display_summary(&stored.name, u, &stored.bids);
    Ok(())
}

fn cmd_runs(conn: &Connection, group: &str, config: &AnalysisConfig, output: Output) -> Result<()> {
    let stored = fetch_group(conn, group)?;
    let runs = blocking_runs(&stored.universe);
    if output.json {
        return print_json(&runs);
    }
    let summary = RunSummary::of(&runs, blocking_candidates(&stored.universe).count());
    display_runs(
        &runs,
        &summary,
        &stored.universe,
        output.top.unwrap_or(config.top_n),
    );
    Ok(())
}

fn cmd_gaps(conn: &Connection, group: &str, config: &AnalysisConfig, output: Output) -> Result<()> {
    let stored = fetch_group(conn, group)?;
    let gaps = find_gaps(&stored.universe);
    if output.json {
        return print_json(&gaps);
    }
    display_gaps(&gaps, output.top.unwrap_or(config.top_n));
    Ok(())
}

fn cmd_catchment(
    conn: &Connection,
    group: &str,
    config: &AnalysisConfig,
    quota: Option<QuotaId>,
    simulate: Option<QuotaId>,
    output: Output,
) -> Result<()> {
    let stored = fetch_group(conn, group)?;
    let u = &stored.universe;
    let total = u.total();

    if let Some(candidate) = simulate {
        let record = what_if_catchment(u, candidate)
            .with_context(|| format!("Simulação da cota {candidate} impossível"))?;
        if output.json {
            return print_json(&record);
        }
        display_catchment(&record, total, true);
        return Ok(());
    }

    if let Some(q) = quota {
        let record = catchment(u, q);
        if output.json {
            return print_json(&record);
        }
        display_catchment(&record, total, false);
        return Ok(());
    }

    let mut table = catchment_table(u);
    if output.json {
        return print_json(&table);
    }
    rank_table(&mut table);
    display_catchment_table(&table, total, output.top.unwrap_or(config.top_n));
    Ok(())
}

fn cmd_buy(conn: &Connection, group: &str, config: &AnalysisConfig, output: Output) -> Result<()> {
    let stored = fetch_group(conn, group)?;
    let u = &stored.universe;

    let pb = if output.json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(u.available().len() as u64)
    };
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
        )?
        .progress_chars("=> "),
    );

    let ranked = rank_purchases_with(u, &|| pb.inc(1))?;
    pb.finish_and_clear();

    if output.json {
        return print_json(&ranked);
    }
    display_purchases(&ranked, u.total(), output.top.unwrap_or(config.top_n));
    Ok(())
}

fn cmd_edges(conn: &Connection, group: &str, config: &AnalysisConfig, output: Output) -> Result<()> {
    let stored = fetch_group(conn, group)?;
    let opportunities = find_opportunities(&stored.universe, &config.edge_search())?;
    if output.json {
        return print_json(&opportunities);
    }
    display_opportunities(
        &opportunities,
        &stored.universe,
        output.top.unwrap_or(config.top_n),
    );
    Ok(())
}

fn cmd_grid(conn: &Connection, group: &str, highlight: bool, numbers: bool) -> Result<()> {
    let stored = fetch_group(conn, group)?;
    let marked: HashSet<QuotaId> = if highlight {
        let runs = blocking_runs(&stored.universe);
        top_length_tiers(&runs, 3)
            .into_iter()
            .flat_map(|r| r.members.iter().copied())
            .collect()
    } else {
        HashSet::new()
    };
    display_grid(&stored.name, &stored.universe, &stored.bids, &marked, numbers);
    Ok(())
}
