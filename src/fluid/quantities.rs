use std::ops::{Index, IndexMut};

use nalgebra::DVector;

use crate::error::{FluidError, Result};

/// Handle to a quantity, resolved once from its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuantityId(usize);

impl QuantityId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Scalar fields carried along by the flow, in construction order.
///
/// The set of labels is fixed when the fluid is built; only the field
/// contents change afterwards.
#[derive(Debug, Clone)]
pub struct Quantities {
    labels: Vec<String>,
    fields: Vec<DVector<f64>>,
}

impl Quantities {
    pub(crate) fn new<I, S>(labels: I, size: usize) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = Vec::new();
        for label in labels {
            let label = label.into();
            if names.contains(&label) {
                return Err(FluidError::DuplicateQuantity(label));
            }
            names.push(label);
        }
        let fields = vec![DVector::zeros(size); names.len()];
        Ok(Self {
            labels: names,
            fields,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    pub fn id(&self, label: &str) -> Option<QuantityId> {
        self.labels.iter().position(|l| l == label).map(QuantityId)
    }

    pub fn label(&self, id: QuantityId) -> &str {
        &self.labels[id.0]
    }

    pub fn get(&self, label: &str) -> Option<&DVector<f64>> {
        self.id(label).map(|id| &self.fields[id.0])
    }

    pub fn get_mut(&mut self, label: &str) -> Option<&mut DVector<f64>> {
        self.id(label).map(move |id| &mut self.fields[id.0])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DVector<f64>)> {
        self.labels.iter().map(String::as_str).zip(self.fields.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut DVector<f64>)> {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.fields.iter_mut())
    }

    pub(crate) fn fields_mut(&mut self) -> impl Iterator<Item = &mut DVector<f64>> {
        self.fields.iter_mut()
    }
}

impl Index<QuantityId> for Quantities {
    type Output = DVector<f64>;

    fn index(&self, id: QuantityId) -> &Self::Output {
        &self.fields[id.0]
    }
}

impl IndexMut<QuantityId> for Quantities {
    fn index_mut(&mut self, id: QuantityId) -> &mut Self::Output {
        &mut self.fields[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_keep_order() {
        let quantities = Quantities::new(["r", "g", "b"], 4).unwrap();
        assert_eq!(quantities.labels().collect::<Vec<_>>(), vec!["r", "g", "b"]);
        assert_eq!(quantities.id("b").map(QuantityId::index), Some(2));
        assert_eq!(quantities.id("alpha"), None);
        assert_eq!(quantities[quantities.id("g").unwrap()].len(), 4);
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let result = Quantities::new(vec!["dye".to_string(), "dye".to_string()], 4);
        assert!(matches!(result, Err(FluidError::DuplicateQuantity(label)) if label == "dye"));
    }

    #[test]
    fn test_mutation_by_label_and_id() {
        let mut quantities = Quantities::new(["dye"], 3).unwrap();
        quantities.get_mut("dye").unwrap()[1] = 2.0;
        let id = quantities.id("dye").unwrap();
        quantities[id][2] += 1.0;
        assert_eq!(quantities.get("dye").unwrap().as_slice(), &[0.0, 2.0, 1.0]);
        assert!(quantities.get_mut("smoke").is_none());
    }

    #[test]
    fn test_iter_mut_pairs_labels_with_fields() {
        let mut quantities = Quantities::new(["r", "g"], 2).unwrap();
        for (label, field) in quantities.iter_mut() {
            field.fill(if label == "r" { 1.0 } else { 2.0 });
        }
        let id = quantities.id("g").unwrap();
        assert_eq!(quantities.label(id), "g");
        assert_eq!(quantities[id].as_slice(), &[2.0, 2.0]);
        assert_eq!(quantities.get("r").unwrap().sum(), 2.0);
    }

    #[test]
    fn test_empty_registry() {
        let quantities = Quantities::new(Vec::<String>::new(), 10).unwrap();
        assert!(quantities.is_empty());
        assert_eq!(quantities.iter().count(), 0);
    }
}
