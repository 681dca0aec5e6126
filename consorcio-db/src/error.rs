use thiserror::Error;

use crate::models::{QuotaId, QuotaStatus};

/// Reasons a quota pool snapshot does not form a valid partition of `1..=total`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UniverseError {
    #[error("o grupo precisa ter pelo menos uma cota")]
    EmptyPool,

    #[error("cota {id} fora dos limites (1-{total})")]
    OutOfRange { id: QuotaId, total: QuotaId },

    #[error("cota {id} aparece como {first} e como {second}")]
    Overlap {
        id: QuotaId,
        first: QuotaStatus,
        second: QuotaStatus,
    },

    #[error("cota {id} não pertence a nenhuma categoria")]
    Uncovered { id: QuotaId },

    #[error("cota {id} não está disponível para compra")]
    NotAvailable { id: QuotaId },
}
