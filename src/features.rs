use crate::types::PatientRecord;

/// Single-row feature table: named columns with one value each.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    columns: Vec<String>,
    values: Vec<f64>,
}

impl FeatureRow {
    #[cfg(test)]
    fn new(columns: Vec<String>, values: Vec<f64>) -> Self {
        Self { columns, values }
    }

    pub fn from_record(rec: &PatientRecord) -> Self {
        let (columns, values) = rec
            .features()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .unzip();
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// First value stored under `name`, if any.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|i| self.values[i])
    }

    /// Reshape into exactly `expected`, in that order.
    ///
    /// Columns the row lacks are filled with 0. Columns not in `expected` are
    /// dropped.
    pub fn align(&self, expected: &[String]) -> FeatureRow {
        let values = order_from_row(self, expected);
        FeatureRow {
            columns: expected.to_vec(),
            values,
        }
    }
}

/// Ordered input vector for a model expecting `feat_list`.
fn order_from_row(row: &FeatureRow, feat_list: &[String]) -> Vec<f64> {
    let mut v = Vec::with_capacity(feat_list.len());
    for k in feat_list {
        v.push(row.get(k).unwrap_or(0.0));
    }
    v
}
