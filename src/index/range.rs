//! Fixed-radius neighbour search over a clustered index

use super::{KmknnIndex, Neighbor, BOUND_SLACK};
use crate::distance::distance;
use crate::error::{validate_radius, Result};

impl KmknnIndex {
    /// Find every reference point within `threshold` of `query`
    ///
    /// The result is unordered. `exclude` removes one reference index from
    /// consideration. Fails with `InvalidRadius` for a negative or NaN threshold.
    pub fn search_radius(&self, query: &[f64], threshold: f64, exclude: Option<usize>) -> Result<Vec<Neighbor>> {
        self.check_query(query)?;
        let threshold = validate_radius(threshold)?;

        let mut found = Vec::new();

        for (cluster_id, dc) in self.centroid_distances(query) {
            let cluster = &self.clusters[cluster_id];
            let slack = BOUND_SLACK * (dc + cluster.radius());
            if dc - cluster.radius() - slack > threshold {
                continue;
            }

            let members = cluster.members();
            let lower = dc - threshold - slack;
            let upper = dc + threshold + slack;
            let start = members.partition_point(|m| m.1 < lower);

            for &(index, from_centroid) in &members[start..] {
                if from_centroid > upper {
                    break;
                }
                if exclude == Some(index) {
                    continue;
                }

                let d = distance(query, self.reference.point(index), self.metric);
                if d <= threshold {
                    found.push(Neighbor::new(index, d));
                }
            }
        }

        Ok(found)
    }
}
