// Circuit endpoints.

use tracing::debug;

use crate::client::NetboxClient;
use crate::error::Error;
use crate::types::{CircuitResponse, CircuitTerminationResponse};

impl NetboxClient {
    /// `GET /api/circuits/circuits/{id}/`
    pub async fn get_circuit(&self, id: u64) -> Result<CircuitResponse, Error> {
        self.get_object("circuit", &format!("circuits/circuits/{id}/"), id)
            .await
    }

    /// Both terminations (A and Z side) of a circuit.
    ///
    /// `GET /api/circuits/circuit-terminations/?circuit_id={id}`
    pub async fn list_circuit_terminations(
        &self,
        circuit_id: u64,
    ) -> Result<Vec<CircuitTerminationResponse>, Error> {
        debug!(circuit_id, "listing circuit terminations");
        self.list_all(
            "circuits/circuit-terminations/",
            &[("circuit_id", circuit_id.to_string())],
        )
        .await
    }
}
