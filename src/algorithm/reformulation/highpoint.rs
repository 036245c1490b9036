//! # Highpoint relaxation
//!
//! Keeps the upper objective and the rows of all levels, the objectives of the lower levels are
//! dropped. A point that is infeasible for this relaxation can't be bilevel feasible.
use tracing::debug;

use crate::algorithm::reformulation::Reformulation;
use crate::data::level::MultilevelProblem;

/// Build the highpoint relaxation of a problem.
#[must_use]
pub fn highpoint(problem: &MultilevelProblem) -> Reformulation {
    let mut reformulation = Reformulation::new(problem, "highpoint");
    for (id, _) in problem.levels() {
        reformulation.add_rows(problem, id);
    }

    debug!(constraints = reformulation.model.active_constraints().count(), "built highpoint relaxation");
    reformulation
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::elements::Sense;
    use crate::data::level::{Kind, LevelId};

    #[test]
    fn all_rows_one_objective() {
        let mut problem = MultilevelProblem::new();
        let lower = problem.add_lower_level(LevelId::UPPER, "lower", Sense::Maximize);
        let x = problem.add_variable(LevelId::UPPER, Kind::Real, "x", 0_f64, f64::INFINITY);
        let y = problem.add_variable(lower, Kind::Real, "y", 0_f64, f64::INFINITY);
        problem.add_fixed(lower, x);
        problem.add_objective_coefficient(LevelId::UPPER, x, 1_f64);
        problem.add_objective_coefficient(lower, y, 1_f64);
        problem.add_row(LevelId::UPPER, &[(x, -1_f64)], -1_f64, "leader");
        problem.add_row(lower, &[(x, 1_f64), (y, 1_f64)], 4_f64, "follower");

        let relaxation = highpoint(&problem);
        assert_eq!(relaxation.model.active_constraints().count(), 2);
        assert_eq!(relaxation.model.active_objectives().count(), 1);
    }
}
