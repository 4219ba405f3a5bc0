use tracing::{debug, info};

use crate::core::Result;
use crate::db::{Collection, Repository};
use crate::survey::{Question, Survey, Tag, Team, TeamUser, User};

use super::models::Trashable;
use super::planner::CascadeStep;


/// Team removal: owned surveys and questions become child records, members
/// pointing at the team are moved elsewhere, team-scoped rows go last.
pub async fn plan_team(repo: &Repository, team_id: &str) -> Result<Vec<CascadeStep>> {
    let mut steps = Vec::new();

    let (surveys, questions, tags) = futures::try_join!(
        repo.find_by::<Survey>("team", team_id),
        repo.find_by::<Question>("team", team_id),
        repo.find_by::<Tag>("team", team_id),
    )?;
    debug!(
        "Team {} owns {} surveys and {} questions",
        team_id,
        surveys.len(),
        questions.len()
    );
    steps.extend(surveys.iter().map(|s| CascadeStep::Spawn(s.trash_target())));
    steps.extend(questions.iter().map(|q| CascadeStep::Spawn(q.trash_target())));

    steps.push(CascadeStep::RepointUsers {
        team: team_id.to_string(),
    });

    for tag in &tags {
        steps.push(CascadeStep::hard_delete(Collection::TagEntities, "tag", &tag.id));
    }
    steps.extend([
        CascadeStep::hard_delete(Collection::Tags, "team", team_id),
        CascadeStep::hard_delete(Collection::Emails, "team", team_id),
        CascadeStep::hard_delete(Collection::TeamUsers, "team", team_id),
        CascadeStep::hard_delete(Collection::Assets, "team", team_id),
        CascadeStep::hard_delete(Collection::Contacts, "team", team_id),
        CascadeStep::hard_delete_row(Collection::Teams, team_id),
    ]);

    Ok(steps)
}


#[derive(Clone)]
pub struct TeamCascade {
    repo: Repository,
}

impl TeamCascade {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Moves every user whose current team is `team_id` to the first other
    /// live team they belong to, or to none.
    pub async fn repoint_users(&self, team_id: &str) -> Result<usize> {
        let users: Vec<User> = self.repo.find_by("currentTeam", team_id).await?;
        let mut moved = 0;

        for mut user in users {
            let next = self.other_team(&user.id, team_id).await?;
            match &next {
                Some(team) => debug!("User {} current team {} -> {}", user.id, team_id, team),
                None => debug!("User {} has no team left after {}", user.id, team_id),
            }
            user.current_team = next;
            self.repo.update(&user).await?;
            moved += 1;
        }

        if moved > 0 {
            info!("Repointed {} users away from team {}", moved, team_id);
        }
        Ok(moved)
    }

    async fn other_team(&self, user_id: &str, leaving: &str) -> Result<Option<String>> {
        let memberships: Vec<TeamUser> = self.repo.find_by("user", user_id).await?;

        for membership in memberships.into_iter().filter(|m| m.team != leaving) {
            match self.repo.get::<Team>(&membership.team).await? {
                Some(team) if !team.in_trash => return Ok(Some(team.id)),
                _ => continue,
            }
        }
        Ok(None)
    }
}
