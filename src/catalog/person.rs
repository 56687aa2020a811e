use serde_json::Value;

use super::params::QueryParams;
use super::transport::Transport;
use super::{CatalogClient, CatalogError};

impl<T: Transport> CatalogClient<T> {
  /// GET /person/{id} with movie and TV credits appended
  pub async fn person_details(&self, person_id: i64) -> Result<Value, CatalogError> {
    self
      .request(
        &format!("/person/{}", person_id),
        QueryParams::new().with("append_to_response", "movie_credits,tv_credits"),
      )
      .await
  }

  /// Movie credits of a person, taken from the person record
  pub async fn actor_movies(&self, person_id: i64) -> Result<Value, CatalogError> {
    let mut person = self.person_details(person_id).await?;
    person
      .get_mut("movie_credits")
      .map(Value::take)
      .ok_or_else(|| CatalogError::Decode(format!("person {} has no movie credits", person_id)))
  }
}
