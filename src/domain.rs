//! Rectangular floor area with obstacles and exits.

use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

use crate::geom::perimeter::Perimeter;
use crate::geom::rectangle::Rectangle;

/// An opening in the domain boundary through which pedestrians leave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Access {
    pub id: usize,
    pub name: String,
    pub shape: Rectangle,
}

impl Access {
    pub fn new(id: usize, name: impl Into<String>, shape: Rectangle) -> Self {
        Self {
            id,
            name: name.into(),
            shape,
        }
    }
}

/// A rectangular building footprint.
///
/// Obstacles and accesses given at construction are fixed for the lifetime of
/// an optimization run. Candidate exits are never added to the domain itself;
/// they are evaluated through a [`DomainView`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub name: String,
    perimeter: Perimeter,
    obstacles: Vec<Rectangle>,
    accesses: Vec<Access>,
}

impl Domain {
    pub fn new(name: &str, width: f64, height: f64) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            perimeter: Perimeter::new(width, height)?,
            obstacles: vec![],
            accesses: vec![],
        })
    }

    pub fn with_obstacle(mut self, obstacle: Rectangle) -> Result<Self> {
        ensure!(
            obstacle.width > 0.0 && obstacle.height > 0.0,
            "Obstacle must have a positive size: {obstacle}"
        );
        ensure!(
            self.bounds().contains(obstacle.left, obstacle.bottom)
                && self.bounds().contains(obstacle.right(), obstacle.top()),
            "Obstacle {obstacle} lies outside domain '{}'",
            self.name
        );
        self.obstacles.push(obstacle);
        Ok(self)
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.accesses.push(access);
        self
    }

    pub fn width(&self) -> f64 {
        self.perimeter.width()
    }

    pub fn height(&self) -> f64 {
        self.perimeter.height()
    }

    pub fn bounds(&self) -> Rectangle {
        Rectangle::new(0.0, 0.0, self.width(), self.height())
    }

    pub fn perimeter(&self) -> Perimeter {
        self.perimeter
    }

    pub fn obstacles(&self) -> &[Rectangle] {
        &self.obstacles
    }

    /// Accesses present before any optimization.
    pub fn accesses(&self) -> &[Access] {
        &self.accesses
    }

    /// Borrows the domain together with candidate accesses.
    pub fn view<'a>(&'a self, extra: &'a [Access]) -> DomainView<'a> {
        DomainView {
            domain: self,
            extra,
        }
    }
}

/// A domain seen with additional candidate accesses, without mutating it.
#[derive(Debug, Clone, Copy)]
pub struct DomainView<'a> {
    pub domain: &'a Domain,
    pub extra: &'a [Access],
}

impl DomainView<'_> {
    pub fn width(&self) -> f64 {
        self.domain.width()
    }

    pub fn height(&self) -> f64 {
        self.domain.height()
    }

    pub fn obstacles(&self) -> &[Rectangle] {
        &self.domain.obstacles
    }

    /// Fixed accesses followed by the candidate ones.
    pub fn accesses(&self) -> impl Iterator<Item = &Access> {
        self.domain.accesses.iter().chain(self.extra.iter())
    }

    pub fn num_accesses(&self) -> usize {
        self.domain.accesses.len() + self.extra.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_size() {
        assert!(Domain::new("d", 0.0, 1.0).is_err());
        assert!(Domain::new("d", 1.0, 0.0).is_err());
    }

    #[test]
    fn test_obstacle_outside_is_rejected() {
        let d = Domain::new("d", 10.0, 5.0).unwrap();
        assert!(d.clone().with_obstacle(Rectangle::new(2.0, 2.0, 1.0, 1.0)).is_ok());
        assert!(d.with_obstacle(Rectangle::new(9.5, 2.0, 1.0, 1.0)).is_err());
    }

    #[test]
    fn test_view_chains_accesses() {
        let fixed = Access::new(0, "main door", Rectangle::new(0.0, 0.0, 1.0, 0.1));
        let d = Domain::new("d", 10.0, 5.0).unwrap().with_access(fixed.clone());
        let extra = vec![Access::new(1, "access 0-0", Rectangle::new(5.0, 0.0, 1.0, 0.1))];
        let view = d.view(&extra);
        assert_eq!(view.num_accesses(), 2);
        let names: Vec<&str> = view.accesses().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["main door", "access 0-0"]);
        // The domain itself is untouched
        assert_eq!(d.accesses(), &[fixed]);
    }
}
