use crate::shared::bounding_box::BoundingBox;

/// Face boxes found in one frame, in the order the backend produced them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DetectionResult {
    boxes: Vec<BoundingBox>,
}

impl DetectionResult {
    pub fn new(boxes: Vec<BoundingBox>) -> Self {
        Self { boxes }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn boxes(&self) -> &[BoundingBox] {
        &self.boxes
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

impl IntoIterator for DetectionResult {
    type Item = BoundingBox;
    type IntoIter = std::vec::IntoIter<BoundingBox>;

    fn into_iter(self) -> Self::IntoIter {
        self.boxes.into_iter()
    }
}

impl<'a> IntoIterator for &'a DetectionResult {
    type Item = &'a BoundingBox;
    type IntoIter = std::slice::Iter<'a, BoundingBox>;

    fn into_iter(self) -> Self::IntoIter {
        self.boxes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        let r = DetectionResult::empty();
        assert!(r.is_empty());
        assert_eq!(r.len(), 0);
    }

    #[test]
    fn test_preserves_order() {
        let a = BoundingBox::new(0, 0, 5, 5);
        let b = BoundingBox::new(3, 3, 9, 9);
        let r = DetectionResult::new(vec![b, a]);
        let collected: Vec<_> = r.into_iter().collect();
        assert_eq!(collected, vec![b, a]);
    }

    #[test]
    fn test_keeps_duplicates() {
        let a = BoundingBox::new(1, 1, 4, 4);
        let r = DetectionResult::new(vec![a, a]);
        assert_eq!(r.len(), 2);
        assert_eq!((&r).into_iter().count(), 2);
    }
}
