// Column resolution for count sheets.
//
// The same concept shows up under different headers depending on which
// system exported the sheet ("Almacén", "Almacen", "Sede", ...). Each
// canonical field owns an ordered alias list; the first alias holding a
// non-blank cell wins. Exact header matches are tried before the
// accent/case/whitespace-insensitive ones.
use crate::types::{CellValue, RawRow};
use once_cell::sync::Lazy;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Location,
    Article,
    SubArticle,
    Subfamily,
    CostCenter,
    Unit,
    SystemStock,
    PhysicalStock,
    Variance,
    UnitCost,
    AdjustmentCost,
    ChargeAmount,
    Status,
    OperativeDate,
    Series,
    DocumentNumber,
}

/// Accepted headers per field, in priority order.
pub const FIELD_ALIASES: &[(Field, &[&str])] = &[
    (Field::Location, &["Almacén", "Almacen", "Sede", "Punto de Venta"]),
    (Field::Article, &["Artículo", "Articulo"]),
    (Field::SubArticle, &["Subartículo", "Subarticulo"]),
    (Field::Subfamily, &["Subfamilia"]),
    (Field::CostCenter, &["Centro de Costos", "Centro de Costo", "Centro Costos"]),
    (
        Field::Unit,
        &["Unidad de Inventario", "Unidad de Medida", "Unidad", "U.M."],
    ),
    (Field::SystemStock, &["Stock a Fecha", "Stock Sistema"]),
    (Field::PhysicalStock, &["Stock Inventario", "Stock Físico"]),
    (Field::Variance, &["Variación Stock", "Variacion Stock", "Variación"]),
    (Field::UnitCost, &["Coste Línea", "Costo Línea", "Costo Unitario"]),
    (Field::AdjustmentCost, &["Costo Ajuste", "Coste Ajuste"]),
    (Field::ChargeAmount, &["Cobro"]),
    (Field::Status, &["Estado", "Estado Normalizado"]),
    (Field::OperativeDate, &["Fecha Doc", "Fecha", "Fecha Operativa"]),
    (Field::Series, &["Serie"]),
    (Field::DocumentNumber, &["Número", "Numero"]),
];

static NORMALIZED_ALIASES: Lazy<HashMap<Field, Vec<String>>> = Lazy::new(|| {
    FIELD_ALIASES
        .iter()
        .map(|(field, aliases)| (*field, aliases.iter().map(|a| normalize_header(a)).collect()))
        .collect()
});

impl Field {
    pub fn aliases(self) -> &'static [&'static str] {
        FIELD_ALIASES
            .iter()
            .find(|(f, _)| *f == self)
            .map(|(_, aliases)| *aliases)
            .unwrap_or(&[])
    }
}

/// Lowercase, strip Spanish accents and collapse inner whitespace so
/// "  ALMACÉN " and "almacen" compare equal.
pub fn normalize_header(header: &str) -> String {
    let folded: String = header
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Per-row lookup over the alias table.
pub struct FieldResolver<'a> {
    row: &'a RawRow,
    by_header: HashMap<String, &'a CellValue>,
}

impl<'a> FieldResolver<'a> {
    pub fn new(row: &'a RawRow) -> Self {
        // Sorted so two headers folding to the same key resolve the same
        // way on every run.
        let mut headers: Vec<&String> = row.keys().collect();
        headers.sort();
        let mut by_header: HashMap<String, &'a CellValue> = HashMap::new();
        for header in headers {
            let cell = &row[header];
            let key = normalize_header(header);
            let taken = by_header.get(&key).map_or(false, |c| !c.is_blank());
            if !taken {
                by_header.insert(key, cell);
            }
        }
        Self { row, by_header }
    }

    /// First non-blank cell among the field's aliases, in alias order.
    /// Each alias is tried verbatim, then case and accent folded.
    pub fn cell(&self, field: Field) -> Option<&'a CellValue> {
        let folded = NORMALIZED_ALIASES.get(&field);
        field.aliases().iter().enumerate().find_map(|(i, alias)| {
            self.row
                .get(*alias)
                .filter(|cell| !cell.is_blank())
                .or_else(|| {
                    folded
                        .and_then(|keys| keys.get(i))
                        .and_then(|key| self.by_header.get(key).copied())
                        .filter(|cell| !cell.is_blank())
                })
        })
    }

    /// Trimmed text of the field, `None` when blank or absent.
    pub fn text(&self, field: Field) -> Option<String> {
        self.cell(field).and_then(CellValue::as_text)
    }

    pub fn text_or(&self, field: Field, default: &str) -> String {
        self.text(field).unwrap_or_else(|| default.to_string())
    }
}
