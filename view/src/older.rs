use crate::{
  config::{AgingPolicy, Config},
  descriptor::PeerDescriptor,
};

/// True when `a` carries staler information than `b` under the
/// configured aging policy.
///
/// Equal effective ages are not older in either direction, so callers
/// scanning a buffer keep the first entry they encountered.
pub fn older(config: &Config, a: &PeerDescriptor, b: &PeerDescriptor) -> bool {
  effective_age(config, a) > effective_age(config, b)
}

fn effective_age(config: &Config, d: &PeerDescriptor) -> i64 {
  let age = i64::from(d.age);
  let nudge = i64::from(config.indegree_age);
  let size = config.size as u64;

  match config.aging {
    AgingPolicy::PureAge => age,
    AgingPolicy::OutDegreeDecay => {
      if u64::from(d.out_degree) * 2 < size {
        age - nudge
      } else {
        age
      }
    }
    AgingPolicy::InDegreeBias => match u64::from(d.in_degree).cmp(&size) {
      std::cmp::Ordering::Greater => age + nudge,
      std::cmp::Ordering::Less => age - nudge,
      std::cmp::Ordering::Equal => age,
    },
  }
}
