//! Power Query (M) type names and their mapping to model data types.

use crate::data_type::DataType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MType {
    Int64,
    Currency,
    Percentage,
    DateTime,
    Date,
    Time,
    DateTimeZone,
    Duration,
    Logical,
    Binary,
    Number,
    Any,
    Text,
}

impl MType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int64 => "Int64.Type",
            Self::Currency => "Currency.Type",
            Self::Percentage => "Percentage.Type",
            Self::DateTime => "type datetime",
            Self::Date => "type date",
            Self::Time => "type time",
            Self::DateTimeZone => "type datetimezone",
            Self::Duration => "type duration",
            Self::Logical => "type logical",
            Self::Binary => "type binary",
            Self::Number => "type number",
            Self::Any => "type any",
            Self::Text => "type text",
        }
    }

    /// Model type a column loaded with this M type ends up with, when the
    /// mapping is defined.
    pub fn to_data_type(self) -> Option<DataType> {
        match self {
            Self::Text | Self::Any => Some(DataType::String),
            Self::Logical => Some(DataType::Boolean),
            Self::DateTime => Some(DataType::DateTime),
            Self::Int64 => Some(DataType::Int64),
            Self::Number => Some(DataType::Double),
            _ => None,
        }
    }

    /// M type used to load a column of the given model type. Types without a
    /// dedicated M counterpart load as `type any`.
    pub fn from_data_type(data_type: &DataType) -> MType {
        match data_type {
            DataType::String => Self::Text,
            DataType::Boolean => Self::Logical,
            DataType::DateTime => Self::DateTime,
            DataType::Int64 => Self::Int64,
            DataType::Double => Self::Number,
            DataType::Decimal => Self::Currency,
            DataType::Binary => Self::Binary,
            DataType::Any | DataType::Variant | DataType::Unknown | DataType::Other(_) => {
                Self::Any
            }
        }
    }
}

impl std::fmt::Display for MType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Render an M list literal: `{a, b, c}`, optionally quoting each item.
pub fn m_list<S: AsRef<str>>(items: &[S], quote: bool) -> String {
    let rendered: Vec<String> = items
        .iter()
        .map(|item| quote_if(item.as_ref(), quote))
        .collect();
    format!("{{{}}}", rendered.join(", "))
}

/// Render a list of two-element M lists: `{{"a", x},{"b", y}}`.
pub fn m_pairs<K: AsRef<str>, V: AsRef<str>>(
    pairs: &[(K, V)],
    quote_keys: bool,
    quote_values: bool,
) -> String {
    let rendered: Vec<String> = pairs
        .iter()
        .map(|(k, v)| {
            m_list(
                &[quote_if(k.as_ref(), quote_keys), quote_if(v.as_ref(), quote_values)],
                false,
            )
        })
        .collect();
    format!("{{{}}}", rendered.join(","))
}

/// Quote `text` as an M text literal, doubling embedded quotes.
pub fn m_text(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

fn quote_if(text: &str, quote: bool) -> String {
    if quote {
        m_text(text)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_type_mapping_round_trips_for_loadable_types() {
        for dt in [
            DataType::String,
            DataType::Boolean,
            DataType::DateTime,
            DataType::Int64,
            DataType::Double,
        ] {
            let m = MType::from_data_type(&dt);
            assert_eq!(m.to_data_type(), Some(dt));
        }
        assert_eq!(MType::from_data_type(&DataType::Any), MType::Any);
        assert_eq!(MType::from_data_type(&DataType::Decimal), MType::Currency);
        assert_eq!(
            MType::from_data_type(&DataType::Other("geography".to_string())),
            MType::Any
        );
    }

    #[test]
    fn list_literals() {
        assert_eq!(m_list(&["a", "b"], true), "{\"a\", \"b\"}");
        assert_eq!(m_list(&["1", "2"], false), "{1, 2}");
        let empty: [&str; 0] = [];
        assert_eq!(m_list(&empty, true), "{}");
    }

    #[test]
    fn pair_literals() {
        let pairs = [("id", MType::Int64.as_str()), ("name", MType::Text.as_str())];
        assert_eq!(
            m_pairs(&pairs, true, false),
            "{{\"id\", Int64.Type},{\"name\", type text}}"
        );
    }

    #[test]
    fn text_literal_escapes_quotes() {
        assert_eq!(m_text("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
