use geo::{Coord, MapCoords, MultiPolygon};
use serde::Deserialize;

/// Map projection for longitude/latitude degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    #[default]
    NaturalEarth,
    Equirectangular,
}

impl Projection {
    /// Projects a point; output is in radians-scale planar units, y up.
    pub fn project(self, coord: Coord<f64>) -> Coord<f64> {
        let lambda = coord.x.to_radians();
        let phi = coord.y.clamp(-90.0, 90.0).to_radians();
        match self {
            Projection::Equirectangular => Coord { x: lambda, y: phi },
            // Natural Earth (Šavrič et al.) polynomial form
            Projection::NaturalEarth => {
                let phi2 = phi * phi;
                let phi4 = phi2 * phi2;
                Coord {
                    x: lambda
                        * (0.8707 - 0.131979 * phi2
                            + phi4 * (-0.013791 + phi4 * (0.003971 * phi2 - 0.001529 * phi4))),
                    y: phi
                        * (1.007226
                            + phi2 * (0.015085 + phi4 * (-0.044475 + 0.028874 * phi2 - 0.005916 * phi4))),
                }
            }
        }
    }

    pub fn project_geometry(self, geometry: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        geometry.map_coords(|c| self.project(c))
    }
}
