use nalgebra::{Point3, UnitQuaternion, Vector3};
use std::collections::BTreeMap;

use crate::config::PhysicsConfig;
use crate::physics::components::{
    apply_velocity_limits, Force, ForceSystem, ForceType, Moment, MotionSystem,
};
use crate::physics::error::PhysicsError;
use crate::physics::shapes::{Material, Shape};
use crate::physics::traits::{
    BodyDesc, BodyId, BodyKind, ContactEvent, Pose, RigidBodyEngine, Velocity,
};

/// Below this closing speed a ground contact comes to rest instead of bouncing
const REST_SPEED: f64 = 0.2;

#[derive(Debug, Clone)]
struct RigidBody {
    shape: Shape,
    material: Material,
    kind: BodyKind,
    motion: MotionSystem,
    forces: ForceSystem,
    position: Vector3<f64>,
    attitude: UnitQuaternion<f64>,
    velocity: Vector3<f64>,
    angular_velocity: Vector3<f64>,
}

impl RigidBody {
    fn from_desc(desc: BodyDesc) -> Result<Self, PhysicsError> {
        desc.shape.validate()?;
        let motion = MotionSystem::new(desc.mass, desc.shape.inertia(desc.mass))?;
        Ok(Self {
            shape: desc.shape,
            material: desc.material,
            kind: desc.kind,
            motion,
            forces: ForceSystem::new(),
            position: desc.pose.position,
            attitude: desc.pose.rotation,
            velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
        })
    }

    fn is_dynamic(&self) -> bool {
        self.kind == BodyKind::Dynamic
    }

    fn inverse_mass(&self) -> f64 {
        if self.is_dynamic() {
            1.0 / self.motion.mass()
        } else {
            0.0
        }
    }
}

/// Rigid-body integrator built directly on nalgebra: semi-implicit Euler,
/// an infinite ground plane and bounding-sphere contacts between bodies.
pub struct NalgebraEngine {
    bodies: BTreeMap<BodyId, RigidBody>,
    gravity: Vector3<f64>,
    ground_height: f64,
    ground_material: Material,
    max_velocity: f64,
    max_angular_velocity: f64,
}

impl NalgebraEngine {
    pub fn new(config: &PhysicsConfig) -> Self {
        Self {
            bodies: BTreeMap::new(),
            gravity: config.gravity_vector(),
            ground_height: config.ground_height,
            ground_material: Material::new(config.ground_friction, config.ground_restitution),
            max_velocity: config.max_velocity,
            max_angular_velocity: config.max_angular_velocity,
        }
    }

    fn body_mut(&mut self, id: &BodyId) -> Result<&mut RigidBody, PhysicsError> {
        self.bodies
            .get_mut(id)
            .ok_or_else(|| PhysicsError::UnknownBody(id.clone()))
    }

    fn integrate_bodies(&mut self, dt: f64) -> Result<(), PhysicsError> {
        for body in self.bodies.values_mut().filter(|b| b.is_dynamic()) {
            body.forces
                .set_pose(Point3::from(body.position), body.attitude);
            body.motion
                .update_accelerations(&body.forces, &self.gravity, &body.attitude);
            body.motion.integrate(
                &mut body.position,
                &mut body.velocity,
                &mut body.attitude,
                &mut body.angular_velocity,
                dt,
            )?;

            let damping = &body.material;
            body.velocity /= 1.0 + damping.linear_damping * dt;
            body.angular_velocity /= 1.0 + damping.angular_damping * dt;
            apply_velocity_limits(
                &mut body.velocity,
                &mut body.angular_velocity,
                self.max_velocity,
                self.max_angular_velocity,
            );

            if !(body.position.iter().all(|v| v.is_finite())
                && body.velocity.iter().all(|v| v.is_finite()))
            {
                return Err(PhysicsError::ComputationError(
                    "non-finite body state after integration".into(),
                ));
            }
        }
        Ok(())
    }

    fn resolve_ground_contacts(&mut self, dt: f64, events: &mut Vec<ContactEvent>) {
        let ground = BodyId::ground();
        let gravity = self.gravity.norm();

        for (id, body) in self.bodies.iter_mut().filter(|(_, b)| b.is_dynamic()) {
            let extent = body.shape.vertical_extent(&body.attitude);
            let penetration = self.ground_height - (body.position.y - extent);
            if penetration <= 0.0 {
                continue;
            }

            body.position.y += penetration;
            let closing_speed = -body.velocity.y;
            let material = body.material.combine(&self.ground_material);

            if closing_speed > 0.0 {
                body.velocity.y = if closing_speed > REST_SPEED {
                    closing_speed * material.restitution
                } else {
                    0.0
                };

                // Coulomb friction bounded by the normal impulse plus resting load
                let normal_dv = closing_speed * (1.0 + material.restitution) + gravity * dt;
                let tangential = Vector3::new(body.velocity.x, 0.0, body.velocity.z);
                let speed = tangential.norm();
                if speed > 0.0 {
                    let reduction = (material.friction * normal_dv).min(speed);
                    body.velocity -= tangential * (reduction / speed);
                }
                body.angular_velocity *= 1.0 - material.friction.min(1.0) * 0.5;
            }

            events.push(ContactEvent {
                a: id.clone(),
                b: ground.clone(),
                point: Point3::new(body.position.x, self.ground_height, body.position.z),
                normal: Vector3::y(),
                relative_speed: closing_speed.max(0.0),
            });
        }
    }

    fn resolve_body_contacts(&mut self, events: &mut Vec<ContactEvent>) {
        let ids: Vec<BodyId> = self.bodies.keys().cloned().collect();

        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                let (Some(a), Some(b)) = (self.bodies.get(&ids[i]), self.bodies.get(&ids[j]))
                else {
                    continue;
                };
                if !a.is_dynamic() && !b.is_dynamic() {
                    continue;
                }

                let delta = a.position - b.position;
                let distance = delta.norm();
                let reach = a.shape.bounding_radius() + b.shape.bounding_radius();
                if distance >= reach || distance <= f64::EPSILON {
                    continue;
                }

                let normal = delta / distance;
                let penetration = reach - distance;
                let (inv_a, inv_b) = (a.inverse_mass(), b.inverse_mass());
                let inv_sum = inv_a + inv_b;
                let closing_speed = -(a.velocity - b.velocity).dot(&normal);
                let restitution = a.material.combine(&b.material).restitution;
                let point = Point3::from(b.position + normal * b.shape.bounding_radius());

                let impulse = if closing_speed > 0.0 {
                    (1.0 + restitution) * closing_speed / inv_sum
                } else {
                    0.0
                };

                if let Some(a) = self.bodies.get_mut(&ids[i]) {
                    a.position += normal * penetration * (inv_a / inv_sum);
                    a.velocity += normal * impulse * inv_a;
                }
                if let Some(b) = self.bodies.get_mut(&ids[j]) {
                    b.position -= normal * penetration * (inv_b / inv_sum);
                    b.velocity -= normal * impulse * inv_b;
                }

                events.push(ContactEvent {
                    a: ids[i].clone(),
                    b: ids[j].clone(),
                    point,
                    normal,
                    relative_speed: closing_speed.max(0.0),
                });
            }
        }
    }
}

impl RigidBodyEngine for NalgebraEngine {
    fn add_body(&mut self, id: BodyId, desc: BodyDesc) -> Result<(), PhysicsError> {
        if id == BodyId::ground() || self.bodies.contains_key(&id) {
            return Err(PhysicsError::DuplicateBody(id));
        }
        let body = RigidBody::from_desc(desc)?;
        self.bodies.insert(id, body);
        Ok(())
    }

    fn remove_body(&mut self, id: &BodyId) -> Result<(), PhysicsError> {
        self.bodies
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| PhysicsError::UnknownBody(id.clone()))
    }

    fn contains(&self, id: &BodyId) -> bool {
        self.bodies.contains_key(id)
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn step(&mut self, dt: f64) -> Result<Vec<ContactEvent>, PhysicsError> {
        let mut events = Vec::new();
        self.integrate_bodies(dt)?;
        self.resolve_body_contacts(&mut events);
        self.resolve_ground_contacts(dt, &mut events);
        Ok(events)
    }

    fn apply_force(
        &mut self,
        id: &BodyId,
        force: Vector3<f64>,
        point: Option<Point3<f64>>,
    ) -> Result<(), PhysicsError> {
        let body = self.body_mut(id)?;
        body.forces
            .add_force(Force::inertial_force(force, point, ForceType::External));
        Ok(())
    }

    fn apply_impulse(
        &mut self,
        id: &BodyId,
        impulse: Vector3<f64>,
        point: Option<Point3<f64>>,
    ) -> Result<(), PhysicsError> {
        let body = self.body_mut(id)?;
        if !body.is_dynamic() {
            return Ok(());
        }
        let offset = point.map(|p| p.coords - body.position);
        body.motion.apply_impulse(
            &mut body.velocity,
            &mut body.angular_velocity,
            &body.attitude,
            &impulse,
            offset.as_ref(),
        );
        Ok(())
    }

    fn apply_torque(&mut self, id: &BodyId, torque: Vector3<f64>) -> Result<(), PhysicsError> {
        let body = self.body_mut(id)?;
        body.forces
            .add_moment(Moment::inertial_moment(torque, ForceType::External));
        Ok(())
    }

    fn clear_forces(&mut self) {
        for body in self.bodies.values_mut() {
            body.forces.clear();
        }
    }

    fn transform(&self, id: &BodyId) -> Option<Pose> {
        self.bodies
            .get(id)
            .map(|b| Pose::new(b.position, b.attitude))
    }

    fn velocity(&self, id: &BodyId) -> Option<Velocity> {
        self.bodies.get(id).map(|b| Velocity {
            linear: b.velocity,
            angular: b.angular_velocity,
        })
    }

    fn set_transform(&mut self, id: &BodyId, pose: Pose) -> Result<(), PhysicsError> {
        let body = self.body_mut(id)?;
        body.position = pose.position;
        body.attitude = pose.rotation;
        Ok(())
    }

    fn set_velocity(&mut self, id: &BodyId, velocity: Velocity) -> Result<(), PhysicsError> {
        let body = self.body_mut(id)?;
        body.velocity = velocity.linear;
        body.angular_velocity = velocity.angular;
        Ok(())
    }

    fn bodies_in_radius(&self, center: &Point3<f64>, radius: f64) -> Vec<BodyId> {
        let radius_sq = radius * radius;
        self.bodies
            .iter()
            .filter(|(_, b)| (b.position - center.coords).norm_squared() <= radius_sq)
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn set_gravity(&mut self, gravity: Vector3<f64>) {
        self.gravity = gravity;
    }

    fn configure(&mut self, config: &PhysicsConfig) {
        self.gravity = config.gravity_vector();
        self.ground_height = config.ground_height;
        self.ground_material = Material::new(config.ground_friction, config.ground_restitution);
        self.max_velocity = config.max_velocity;
        self.max_angular_velocity = config.max_angular_velocity;
    }

    fn clear(&mut self) {
        self.bodies.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn engine() -> NalgebraEngine {
        NalgebraEngine::new(&PhysicsConfig::default())
    }

    fn ball(y: f64) -> BodyDesc {
        BodyDesc::dynamic(
            Shape::sphere(0.5),
            1.0,
            Pose::from_position(Vector3::new(0.0, y, 0.0)),
            Material::default(),
        )
    }

    #[test]
    fn test_free_fall() {
        let mut engine = engine();
        let id = BodyId::new("ball");
        engine.add_body(id.clone(), ball(100.0)).unwrap();

        for _ in 0..60 {
            engine.step(1.0 / 60.0).unwrap();
        }

        let velocity = engine.velocity(&id).unwrap();
        assert_relative_eq!(velocity.linear.y, -9.81, epsilon = 1e-9);
        assert!(engine.transform(&id).unwrap().position.y < 100.0 - 4.8);
    }

    #[test]
    fn test_ground_contact_stops_body() {
        let mut engine = engine();
        let id = BodyId::new("ball");
        engine.add_body(id.clone(), ball(0.6)).unwrap();

        let mut touched = false;
        for _ in 0..240 {
            let events = engine.step(1.0 / 60.0).unwrap();
            touched |= events.iter().any(|e| e.b == BodyId::ground());
        }

        let pose = engine.transform(&id).unwrap();
        assert!(touched);
        assert!(pose.position.y >= 0.5 - 1e-9);
        assert!(engine.velocity(&id).unwrap().linear.norm() < 0.5);
    }

    #[test]
    fn test_force_balances_gravity() {
        let mut engine = engine();
        let id = BodyId::new("ball");
        engine.add_body(id.clone(), ball(10.0)).unwrap();

        for _ in 0..30 {
            engine
                .apply_force(&id, Vector3::new(0.0, 9.81, 0.0), None)
                .unwrap();
            engine.step(1.0 / 60.0).unwrap();
            engine.clear_forces();
        }

        assert_relative_eq!(engine.transform(&id).unwrap().position.y, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sphere_contact_separates_bodies() {
        let mut engine = engine();
        engine.set_gravity(Vector3::zeros());
        let left = BodyId::new("left");
        let right = BodyId::new("right");
        let mut a = ball(10.0);
        a.pose.position.x = -0.45;
        let mut b = ball(10.0);
        b.pose.position.x = 0.45;
        engine.add_body(left.clone(), a).unwrap();
        engine.add_body(right.clone(), b).unwrap();
        engine
            .set_velocity(
                &left,
                Velocity {
                    linear: Vector3::new(1.0, 0.0, 0.0),
                    angular: Vector3::zeros(),
                },
            )
            .unwrap();

        let events = engine.step(1.0 / 60.0).unwrap();
        assert_eq!(events.len(), 1);

        let vl = engine.velocity(&left).unwrap().linear.x;
        let vr = engine.velocity(&right).unwrap().linear.x;
        assert!(vr > 0.0);
        assert!(vl < 1.0);
    }

    #[test]
    fn test_duplicate_and_reserved_ids_rejected() {
        let mut engine = engine();
        engine.add_body(BodyId::new("a"), ball(1.0)).unwrap();
        assert_eq!(
            engine.add_body(BodyId::new("a"), ball(2.0)),
            Err(PhysicsError::DuplicateBody(BodyId::new("a")))
        );
        assert!(engine.add_body(BodyId::ground(), ball(2.0)).is_err());
        assert_eq!(engine.body_count(), 1);
    }

    #[test]
    fn test_bodies_in_radius() {
        let mut engine = engine();
        engine.add_body(BodyId::new("near"), ball(1.0)).unwrap();
        engine.add_body(BodyId::new("far"), ball(50.0)).unwrap();

        let found = engine.bodies_in_radius(&Point3::new(0.0, 0.0, 0.0), 5.0);
        assert_eq!(found, vec![BodyId::new("near")]);
    }
}
