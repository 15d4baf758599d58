//! Heights of the support layers.

use super::SupportGenerator;
use crate::slice::Layer;
use crate::{CoordF, EPSILON};

/// Sort and drop values closer than [`EPSILON`] to their predecessor.
fn sort_dedup(z: &mut Vec<CoordF>) {
    z.sort_by(|a, b| a.total_cmp(b));
    z.dedup_by(|b, a| (*b - *a).abs() < EPSILON);
}

impl SupportGenerator<'_> {
    /// Compute the ordered top Z of every support layer.
    ///
    /// The first layer always ends at `first_layer_height`. Raft layers
    /// split the space between it and the lowest contact evenly. Above the
    /// raft, layers follow contacts, object tops (plus the contact gap) and
    /// the object's own layers, and any gap taller than the maximum
    /// support layer height is split evenly.
    ///
    /// The maximum height is a bound, not a target: a layer that follows
    /// the object's own Zs is as thick as the object layer, so with a
    /// 0.4mm nozzle and 0.3mm object layers most support layers are 0.3mm
    /// rather than 0.32mm.
    pub fn support_layers_z(
        &self,
        contact_z: &[CoordF],
        top_z: &[CoordF],
        layers: &[Layer],
    ) -> Vec<CoordF> {
        if contact_z.is_empty() {
            return Vec::new();
        }

        let config = self.object_config;
        let first_layer_height = config.first_layer_height;
        let raft_layers = config.raft_layers as usize;
        let max_height = self.max_support_layer_height();
        let contact_distance = self.contact_distance(max_height, self.print_config.nozzle_diameter);

        let highest_contact = contact_z.iter().copied().fold(CoordF::MIN, CoordF::max);

        let mut z: Vec<CoordF> = contact_z.to_vec();
        z.extend_from_slice(top_z);
        z.extend(top_z.iter().map(|t| t + contact_distance));
        z.extend(
            layers
                .iter()
                .map(|l| l.print_z)
                .filter(|&pz| pz <= highest_contact + EPSILON),
        );
        // nothing is supported above the highest contact
        z.retain(|&v| v <= highest_contact + EPSILON);
        sort_dedup(&mut z);

        // enforce first layer height
        z.retain(|&v| v > first_layer_height + EPSILON);
        z.insert(0, first_layer_height);

        // raft layers evenly split the space up to the first contact
        if raft_layers > 1 && z.len() >= 2 {
            let step = (z[1] - z[0]) / (raft_layers - 1) as CoordF;
            let raft: Vec<CoordF> = (1..raft_layers - 1)
                .map(|k| z[0] + step * k as CoordF)
                .collect();
            z.splice(1..1, raft);
        }

        // split tall gaps above the raft
        let mut out = Vec::with_capacity(z.len());
        for (i, &v) in z.iter().enumerate() {
            if i > 0 && i >= raft_layers {
                let prev = z[i - 1];
                let gap = v - prev;
                if gap > max_height + EPSILON {
                    let n = (gap / max_height - EPSILON).ceil().max(1.0) as usize;
                    let step = gap / n as CoordF;
                    out.extend((1..n).map(|k| prev + step * k as CoordF));
                }
            }
            out.push(v);
        }

        sort_dedup(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PrintConfig, PrintObjectConfig};
    use crate::geometry::{ExPolygon, Polygon};

    fn object_layers(first: f64, height: f64, count: usize) -> Vec<Layer> {
        let square = vec![ExPolygon::new(Polygon::square_mm(0.0, 0.0, 10.0))];
        (0..count)
            .map(|i| {
                let z = first + height * i as f64;
                let h = if i == 0 { first } else { height };
                Layer::new(i, z, h, square.clone())
            })
            .collect()
    }

    fn heights(z: &[f64]) -> Vec<f64> {
        z.iter()
            .enumerate()
            .map(|(i, &v)| if i == 0 { v } else { v - z[i - 1] })
            .collect()
    }

    #[test]
    fn test_no_contacts_no_layers() {
        let print = PrintConfig::default();
        let object = PrintObjectConfig::default().support(true);
        let generator = SupportGenerator::new(&print, &object).unwrap();
        assert!(generator
            .support_layers_z(&[], &[], &object_layers(0.35, 0.3, 5))
            .is_empty());
    }

    #[test]
    fn test_layers_follow_object_zs() {
        let print = PrintConfig::default().nozzle_diameter(0.4);
        let object = PrintObjectConfig::default().support(true);
        let generator = SupportGenerator::new(&print, &object).unwrap();
        let layers = object_layers(0.35, 0.3, 10);

        let z = generator.support_layers_z(&[layers[6].print_z], &[], &layers);
        assert_eq!(z.len(), 7);
        // object layers are thinner than the bound, so support follows them
        for h in heights(&z).iter().skip(1) {
            assert!((h - 0.3).abs() < 1e-9);
        }
    }

    #[test]
    fn test_gaps_are_bounded() {
        let print = PrintConfig::default().nozzle_diameter(0.4);
        let object = PrintObjectConfig::default().support(true);
        let generator = SupportGenerator::new(&print, &object).unwrap();

        // a single high contact with no object layers in between
        let z = generator.support_layers_z(&[5.0], &[], &[]);
        assert!((z[0] - 0.35).abs() < 1e-9);
        assert!((z.last().unwrap() - 5.0).abs() < 1e-9);
        for h in heights(&z).iter().skip(1) {
            assert!(*h <= 0.32 + 1e-6, "height {} too large", h);
            assert!(*h > 0.0);
        }
    }

    #[test]
    fn test_tracks_object_layers() {
        let print = PrintConfig::default().nozzle_diameter(0.4);
        let object = PrintObjectConfig::default().support(true);
        let generator = SupportGenerator::new(&print, &object).unwrap();
        let layers = object_layers(0.35, 0.3, 20);

        let z = generator.support_layers_z(&[2.45], &[], &layers);
        for layer in layers.iter().filter(|l| l.print_z <= 2.45) {
            assert!(z.iter().any(|v| (v - layer.print_z).abs() < 1e-6));
        }
        assert!(z.iter().all(|&v| v <= 2.45 + 1e-6));
        assert!((heights(&z)[1] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_tops_add_contact_gap() {
        let print = PrintConfig::default().nozzle_diameter(0.4);
        let object = PrintObjectConfig::default().support(true);
        let generator = SupportGenerator::new(&print, &object).unwrap();

        let z = generator.support_layers_z(&[4.0], &[1.0], &[]);
        assert!(z.iter().any(|v| (v - 1.0).abs() < 1e-6));
        // gap = nozzle + contact distance
        assert!(z.iter().any(|v| (v - 1.6).abs() < 1e-6));
    }

    #[test]
    fn test_raft_layers_split_evenly() {
        let print = PrintConfig::default();
        let object = PrintObjectConfig::default()
            .raft_layers(3)
            .first_layer_height(0.4)
            .layer_height(0.3);
        let generator = SupportGenerator::new(&print, &object).unwrap();

        let z = generator.support_layers_z(&[1.2], &[], &[]);
        assert_eq!(z.len(), 3);
        assert!((z[0] - 0.4).abs() < 1e-9);
        assert!((z[1] - 0.8).abs() < 1e-9);
        assert!((z[2] - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_low_contacts_collapse_into_first_layer() {
        let print = PrintConfig::default();
        let object = PrintObjectConfig::default().support(true);
        let generator = SupportGenerator::new(&print, &object).unwrap();
        let z = generator.support_layers_z(&[0.35, 0.2], &[], &[]);
        assert_eq!(z, vec![0.35]);
    }
}
