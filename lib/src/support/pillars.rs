//! Pillar support shape.
//!
//! Instead of a continuous body, pillar support is a grid of square
//! columns. Under each contact the columns widen into capitals so the
//! contact is carried evenly; contact left uncovered by any capital is
//! projected straight down.

use super::{SupportGenerator, ZRegions, PILLAR_SIZE, PILLAR_SPACING};
use crate::clipper::{difference, grow, intersection, shrink, union_ex};
use crate::geometry::{get_extents, ExPolygon, ExPolygons, Polygon};
use crate::{unscale, CoordF, Result};

/// Squares of `PILLAR_SIZE` every `PILLAR_SPACING` over the given regions' extents.
fn pillar_grid(regions: &[ExPolygon]) -> ExPolygons {
    let bb = get_extents(regions);
    if !bb.defined {
        return Vec::new();
    }
    let (x_min, y_min) = (unscale(bb.min.x), unscale(bb.min.y));
    let (x_max, y_max) = (unscale(bb.max.x), unscale(bb.max.y));

    let mut pillars = Vec::new();
    let mut x = x_min;
    while x <= x_max - PILLAR_SIZE {
        let mut y = y_min;
        while y <= y_max - PILLAR_SIZE {
            pillars.push(ExPolygon::new(Polygon::square_mm(x, y, PILLAR_SIZE)));
            y += PILLAR_SPACING;
        }
        x += PILLAR_SPACING;
    }
    union_ex(&pillars)
}

impl SupportGenerator<'_> {
    /// Build the pillar shape of every support layer.
    pub(crate) fn generate_pillars_shape(
        &self,
        contact: &ZRegions,
        support_z: &[CoordF],
    ) -> Result<Vec<ExPolygons>> {
        if contact.is_empty() {
            return Ok(Vec::new());
        }

        let all_contacts: ExPolygons = contact.iter().flat_map(|(_, r)| r.iter().cloned()).collect();
        let grid = pillar_grid(&all_contacts);
        let mut shape: Vec<ExPolygons> = vec![grid.clone(); support_z.len()];

        let capital_growth = (PILLAR_SPACING - PILLAR_SIZE) / 2.0;
        let capital_shrink = self.interface_flow.width / 2.0;
        let pillar_area = PILLAR_SIZE * PILLAR_SIZE;

        for (i, &z) in support_z.iter().enumerate() {
            let Some(this_contact) = contact.get(z) else {
                continue;
            };
            self.check_cancelled()?;

            let capitals = intersection(&grid, this_contact);

            // each capital is shrunk on its own so neighbours never merge
            let mut supported: ExPolygons = Vec::new();
            for capital in capitals {
                let mut capital = grow(&[capital], capital_growth);
                supported.extend(capital.iter().cloned());
                for j in (0..i).rev() {
                    capital = shrink(&capital, capital_shrink);
                    let area: CoordF = capital.iter().map(ExPolygon::area_mm2).sum();
                    if area <= pillar_area {
                        break;
                    }
                    shape[j].extend(capital.iter().cloned());
                }
            }

            let unsupported = difference(this_contact, &union_ex(&supported));
            if !unsupported.is_empty() {
                for layer_shape in shape.iter_mut().take(i) {
                    layer_shape.extend(unsupported.iter().cloned());
                }
            }
        }

        Ok(shape.iter().map(|s| union_ex(s)).collect())
    }

    /// Restrict support regions to the pillar shape.
    ///
    /// The first layer and raft layers are left whole, for a continuous
    /// base flange.
    pub(crate) fn clip_with_shape(&self, support: &mut [ExPolygons], shape: &[ExPolygons]) {
        let raft_layers = self.object_config.raft_layers as usize;
        for (i, (regions, layer_shape)) in support.iter_mut().zip(shape).enumerate() {
            if i == 0 || i < raft_layers || regions.is_empty() {
                continue;
            }
            *regions = intersection(regions, layer_shape);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipper::total_area;
    use crate::config::{PrintConfig, PrintObjectConfig};

    fn make_square_mm(x: f64, y: f64, size: f64) -> ExPolygons {
        vec![ExPolygon::new(Polygon::square_mm(x, y, size))]
    }

    #[test]
    fn test_pillar_grid() {
        let grid = pillar_grid(&make_square_mm(0.0, 0.0, 25.0));
        // origins at 0, 10 and 20 on each axis
        assert_eq!(grid.len(), 9);
        assert!((total_area(&grid) - 9.0 * PILLAR_SIZE * PILLAR_SIZE).abs() < 0.01);
        assert!(pillar_grid(&[]).is_empty());
    }

    #[test]
    fn test_capitals_taper_downward() {
        let print = PrintConfig::default().nozzle_diameter(0.4);
        let object = PrintObjectConfig::default().support(true);
        let generator = SupportGenerator::new(&print, &object).unwrap();

        let support_z: Vec<f64> = (0..10).map(|i| 0.35 + 0.3 * i as f64).collect();
        let mut contact = ZRegions::new();
        contact.insert(support_z[9], make_square_mm(0.0, 0.0, 20.0));

        let shape = generator.generate_pillars_shape(&contact, &support_z).unwrap();
        assert_eq!(shape.len(), 10);
        let areas: Vec<f64> = shape.iter().map(|s| total_area(s)).collect();
        // layers right below the contact carry the widest capitals
        assert!(areas[8] > areas[0]);
        for w in areas[..9].windows(2) {
            assert!(w[0] <= w[1] + 0.01);
        }
        // every layer keeps at least the bare pillars
        let grid_area = total_area(&pillar_grid(&make_square_mm(0.0, 0.0, 20.0)));
        assert!(areas[0] >= grid_area - 0.01);
    }

    #[test]
    fn test_clip_with_shape_skips_first_and_raft() {
        let print = PrintConfig::default();
        let object = PrintObjectConfig::default().raft_layers(2);
        let generator = SupportGenerator::new(&print, &object).unwrap();

        let full = make_square_mm(0.0, 0.0, 20.0);
        let mut support = vec![full.clone(); 4];
        let shape = vec![make_square_mm(0.0, 0.0, 5.0); 4];
        generator.clip_with_shape(&mut support, &shape);

        assert!((total_area(&support[0]) - 400.0).abs() < 0.01);
        assert!((total_area(&support[1]) - 400.0).abs() < 0.01);
        assert!((total_area(&support[2]) - 25.0).abs() < 0.01);
        assert!((total_area(&support[3]) - 25.0).abs() < 0.01);
    }
}
