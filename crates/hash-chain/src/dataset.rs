//! The bread supply chain shown by the viewer

use crate::error::Result;
use crate::stage::{StageFields, StageRecord};

fn stage(
    index: u64,
    timestamp: &str,
    icon: &str,
    title: &str,
    fields: &[(&str, &str)],
) -> Result<StageRecord> {
    let data = StageFields::new(fields.iter().copied())?;
    StageRecord::new(index, timestamp, icon, title, data)
}

/// Farm to shelf, six stages. Frozen: every hash in the published chain
/// depends on this exact content.
pub fn bread_supply_chain() -> Result<Vec<StageRecord>> {
    [
        stage(
            0,
            "2025-10-15T08:00:00Z",
            "🌱",
            "Genesis Block",
            &[
                ("Tip", "Bloc Inițial"),
                ("Descriere", "Punct de pornire al lanțului blockchain"),
                ("Network", "Bread Traceability Chain"),
            ],
        ),
        stage(
            1,
            "2025-10-20T10:30:00Z",
            "🌾",
            "Ferma",
            &[
                ("Fermier", "AgroVerde SRL"),
                ("Locație", "Călărași, România"),
                ("Cultură", "Grâu de toamnă (Triticum aestivum)"),
                ("Suprafață", "250 hectare"),
                ("Certificare", "BIO Certificate"),
                ("Hibrid", "Soiul Dropia"),
            ],
        ),
        stage(
            2,
            "2025-10-22T14:15:00Z",
            "⚙️",
            "Moară",
            &[
                ("Moară", "PanMălina Industrial"),
                ("Lot", "GRAU-1025-CL"),
                ("Calitate", "Clasa I - Proteină 12.5%"),
                ("Umiditate", "13.2%"),
                ("Certificări", "ISO 22000, HACCP"),
                ("Data procesării", "2025-10-22"),
            ],
        ),
        stage(
            3,
            "2025-10-23T09:45:00Z",
            "📡",
            "Senzori IoT",
            &[
                ("Temperatură", "22.5°C"),
                ("Umiditate", "65%"),
                ("Condiții", "Parțial înnorat"),
                ("Monitorizare", "Real-time sensors"),
                ("Status", "Optimal pentru depozitare"),
            ],
        ),
        stage(
            4,
            "2025-10-25T11:20:00Z",
            "🍞",
            "Brutărie",
            &[
                ("Brutărie", "Pâinea Caldă"),
                ("Producție", "Pâine artizanală"),
                ("Rețetă", "Tradițională cu maia naturală"),
                ("Lot pâine", "PAINE-1025-001"),
                ("Cantitate", "500 kg"),
                ("Data coacere", "2025-10-25"),
            ],
        ),
        stage(
            5,
            "2025-10-26T07:00:00Z",
            "🛒",
            "Magazin",
            &[
                ("Magazin", "SuperMarket Fresh"),
                ("Locație", "București, Sector 3"),
                ("Data livrare", "2025-10-26"),
                ("Preț", "8.50 RON/kg"),
                ("Disponibilitate", "În stoc"),
                ("Cod produs", "BREAD-TRACE-001"),
            ],
        ),
    ]
    .into_iter()
    .collect()
}
