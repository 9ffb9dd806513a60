use arrow::datatypes::DataType;

/// Parse a cell as a float, ignoring surrounding whitespace.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok()
}

/// Render a float the way it goes back into a CSV cell.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return String::new();
    }
    format!("{}", value)
}

/// Infer the Arrow dtype of a column: `Float64` when every non-null cell is
/// numeric (and at least one exists), `Utf8` otherwise.
pub fn infer_arrow_dtype<'a, I>(cells: I) -> DataType
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut saw_value = false;
    for cell in cells.into_iter().flatten() {
        if parse_number(cell).is_none() {
            return DataType::Utf8;
        }
        saw_value = true;
    }
    if saw_value {
        DataType::Float64
    } else {
        DataType::Utf8
    }
}
