//! User and club snapshot entities.

use domain::models::{Club, User};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct UserSnapshotEntity {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
    pub barcode: String,
}

impl From<UserSnapshotEntity> for User {
    fn from(entity: UserSnapshotEntity) -> Self {
        User {
            id: entity.id,
            first_name: entity.first_name,
            last_name: entity.last_name,
            avatar: entity.avatar,
            barcode: entity.barcode,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ClubSnapshotEntity {
    pub id: i64,
    pub name: String,
    pub logo_url: Option<String>,
}

impl From<ClubSnapshotEntity> for Club {
    fn from(entity: ClubSnapshotEntity) -> Self {
        Club {
            id: entity.id,
            name: entity.name,
            logo_url: entity.logo_url,
        }
    }
}
