use nalgebra::{Point3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Origin of a force acting on a body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ForceType {
    Propulsive,
    Drag,
    Contact,
    External,
}

/// Reference frames for forces and moments
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReferenceFrame {
    /// Inertial/world frame
    Inertial,
    /// Body-fixed frame
    Body,
}

/// A force vector with an optional world-space point of application
#[derive(Debug, Clone)]
pub struct Force {
    /// Force vector in Newtons
    pub magnitude: Vector3<f64>,
    /// Point of application in world coordinates (if None, force is applied at CG)
    pub application_point: Option<Point3<f64>>,
    pub frame: ReferenceFrame,
    pub force_type: ForceType,
}

/// A pure moment/torque vector
#[derive(Debug, Clone)]
pub struct Moment {
    /// Moment vector in Newton-meters
    pub magnitude: Vector3<f64>,
    pub frame: ReferenceFrame,
    pub force_type: ForceType,
}

/// Forces and moments accumulated on one body until they are cleared
#[derive(Debug, Clone)]
pub struct ForceSystem {
    forces: Vec<Force>,
    moments: Vec<Moment>,
    /// Body attitude for frame transformations
    attitude: UnitQuaternion<f64>,
    /// Centre of mass in world coordinates, for moment arms
    centre_of_mass: Point3<f64>,
}

impl Default for ForceSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl ForceSystem {
    pub fn new() -> Self {
        Self {
            forces: Vec::new(),
            moments: Vec::new(),
            attitude: UnitQuaternion::identity(),
            centre_of_mass: Point3::origin(),
        }
    }

    /// Set the current pose used for frame transformations and moment arms
    pub fn set_pose(&mut self, centre_of_mass: Point3<f64>, attitude: UnitQuaternion<f64>) {
        self.centre_of_mass = centre_of_mass;
        self.attitude = attitude;
    }

    pub fn add_force(&mut self, force: Force) {
        self.forces.push(force);
    }

    pub fn add_moment(&mut self, moment: Moment) {
        self.moments.push(moment);
    }

    /// Clear all forces and moments
    pub fn clear(&mut self) {
        self.forces.clear();
        self.moments.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.forces.is_empty() && self.moments.is_empty()
    }

    /// Net force in inertial frame
    pub fn net_force(&self) -> Vector3<f64> {
        self.forces
            .iter()
            .map(|force| self.to_inertial(force.magnitude, force.frame))
            .sum()
    }

    /// Net moment about the CG in inertial frame
    pub fn net_moment(&self) -> Vector3<f64> {
        let force_moments = self
            .forces
            .iter()
            .filter_map(|force| {
                force.application_point.map(|point| {
                    let arm = point - self.centre_of_mass;
                    arm.cross(&self.to_inertial(force.magnitude, force.frame))
                })
            })
            .sum::<Vector3<f64>>();

        let direct_moments = self
            .moments
            .iter()
            .map(|moment| self.to_inertial(moment.magnitude, moment.frame))
            .sum::<Vector3<f64>>();

        force_moments + direct_moments
    }

    /// Net force of a specific type in inertial frame
    pub fn get_forces_by_type(&self, force_type: ForceType) -> Vector3<f64> {
        self.forces
            .iter()
            .filter(|f| f.force_type == force_type)
            .map(|force| self.to_inertial(force.magnitude, force.frame))
            .sum()
    }

    fn to_inertial(&self, vector: Vector3<f64>, frame: ReferenceFrame) -> Vector3<f64> {
        match frame {
            ReferenceFrame::Inertial => vector,
            ReferenceFrame::Body => self.attitude * vector,
        }
    }
}

impl Force {
    pub fn new(
        magnitude: Vector3<f64>,
        application_point: Option<Point3<f64>>,
        frame: ReferenceFrame,
        force_type: ForceType,
    ) -> Self {
        Self {
            magnitude,
            application_point,
            frame,
            force_type,
        }
    }

    /// Create a force in inertial frame, optionally off-centre
    pub fn inertial_force(
        magnitude: Vector3<f64>,
        application_point: Option<Point3<f64>>,
        force_type: ForceType,
    ) -> Self {
        Self::new(magnitude, application_point, ReferenceFrame::Inertial, force_type)
    }

    /// Create a force applied at the CG in body frame
    pub fn body_force(magnitude: Vector3<f64>, force_type: ForceType) -> Self {
        Self::new(magnitude, None, ReferenceFrame::Body, force_type)
    }
}

impl Moment {
    pub fn inertial_moment(magnitude: Vector3<f64>, force_type: ForceType) -> Self {
        Self {
            magnitude,
            frame: ReferenceFrame::Inertial,
            force_type,
        }
    }

    pub fn body_moment(magnitude: Vector3<f64>, force_type: ForceType) -> Self {
        Self {
            magnitude,
            frame: ReferenceFrame::Body,
            force_type,
        }
    }
}
