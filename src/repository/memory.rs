//! In-memory repositories for service unit tests.

use super::car::{CarFilter, CarRepository, CarSort, CarStatusCounts};
use super::query::{Page, SortOrder};
use super::user::UserRepository;
use crate::error::{AppError, AppResult};
use crate::models::{user::UserRole, CarModel, UserModel};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<Uuid, UserModel>>,
    writes: AtomicUsize,
}

impl InMemoryUserRepository {
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn get(&self, id: Uuid) -> Option<UserModel> {
        self.users.lock().unwrap().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.users.lock().unwrap().len()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find(&self, id: Uuid) -> AppResult<Option<UserModel>> {
        Ok(self.get(id))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserModel>> {
        let email = email.trim().to_lowercase();
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<UserModel>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.username == username.trim())
            .cloned())
    }

    async fn list(&self, role: Option<UserRole>, page: Page) -> AppResult<(Vec<UserModel>, u64)> {
        let mut users: Vec<UserModel> = self
            .users
            .lock()
            .unwrap()
            .values()
            .filter(|u| role.is_none_or(|r| u.role == r))
            .cloned()
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = users.len() as u64;
        let items = users
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();
        Ok((items, total))
    }

    async fn insert(&self, user: UserModel) -> AppResult<UserModel> {
        let mut users = self.users.lock().unwrap();
        if users
            .values()
            .any(|u| u.email == user.email || u.username == user.username)
        {
            return Err(AppError::Conflict("duplicate user".into()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn save(&self, user: UserModel) -> AppResult<UserModel> {
        let mut users = self.users.lock().unwrap();
        let stored = users.get_mut(&user.id).ok_or(AppError::NotFound("user"))?;
        let password_hash = stored.password_hash.clone();
        *stored = UserModel {
            password_hash,
            ..user
        };
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(stored.clone())
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: String) -> AppResult<()> {
        let mut users = self.users.lock().unwrap();
        let stored = users.get_mut(&id).ok_or(AppError::NotFound("user"))?;
        stored.password_hash = password_hash;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn record_login(&self, id: Uuid, at: NaiveDateTime) -> AppResult<()> {
        if let Some(user) = self.users.lock().unwrap().get_mut(&id) {
            user.last_login = Some(at);
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.users.lock().unwrap().remove(&id).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryCarRepository {
    cars: Mutex<HashMap<Uuid, CarModel>>,
    writes: AtomicUsize,
}

impl InMemoryCarRepository {
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn get(&self, id: Uuid) -> Option<CarModel> {
        self.cars.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl CarRepository for InMemoryCarRepository {
    async fn find(&self, id: Uuid) -> AppResult<Option<CarModel>> {
        Ok(self.get(id))
    }

    async fn list(
        &self,
        filter: &CarFilter,
        sort: CarSort,
        order: SortOrder,
        page: Page,
    ) -> AppResult<(Vec<CarModel>, u64)> {
        let mut cars: Vec<CarModel> = self
            .cars
            .lock()
            .unwrap()
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        cars.sort_by(|a, b| {
            let ord = match sort {
                CarSort::CreatedAt => a.created_at.cmp(&b.created_at),
                CarSort::Price => a.price.cmp(&b.price),
                CarSort::Year => a.year.cmp(&b.year),
                CarSort::Mileage => a.mileage.cmp(&b.mileage),
                CarSort::ViewCount => a.view_count.cmp(&b.view_count),
            };
            match order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });
        let total = cars.len() as u64;
        let items = cars
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();
        Ok((items, total))
    }

    async fn insert(&self, car: CarModel) -> AppResult<CarModel> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.cars.lock().unwrap().insert(car.id, car.clone());
        Ok(car)
    }

    async fn save(&self, car: CarModel) -> AppResult<CarModel> {
        let mut cars = self.cars.lock().unwrap();
        let stored = cars.get_mut(&car.id).ok_or(AppError::NotFound("car"))?;
        let view_count = stored.view_count;
        *stored = CarModel { view_count, ..car };
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(stored.clone())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(self.cars.lock().unwrap().remove(&id).is_some())
    }

    async fn increment_view_count(&self, id: Uuid) -> AppResult<Option<CarModel>> {
        let mut cars = self.cars.lock().unwrap();
        Ok(cars.get_mut(&id).map(|car| {
            car.view_count += 1;
            car.clone()
        }))
    }

    async fn status_counts(&self, seller_id: Option<Uuid>) -> AppResult<CarStatusCounts> {
        let mut counts = CarStatusCounts::default();
        for car in self.cars.lock().unwrap().values() {
            if seller_id.is_some_and(|s| s != car.seller_id) {
                continue;
            }
            counts.add(car.status, 1, car.is_verified as u64, car.view_count);
        }
        Ok(counts)
    }
}
